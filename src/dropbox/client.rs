use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::app::{AppConfig, Secrets};
use crate::dropbox::token::refresh_access_token;
use crate::error::{PipelineError, Result};
use crate::storage::{RemoteEntry, RemoteStore, join_remote};

/// Dropbox 接口地址与超时
#[derive(Debug, Clone)]
pub struct DropboxConfig {
    pub token_url: String,
    pub api_base_url: String,
    pub content_base_url: String,
    pub timeout: Duration,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self::from(&app)
    }
}

impl From<&AppConfig> for DropboxConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            token_url: app.token_url.clone(),
            api_base_url: app.api_base_url.trim_end_matches('/').to_string(),
            content_base_url: app.content_base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(app.http_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<RemoteEntry>,
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    path_display: Option<String>,
}

/// Dropbox HTTP v2 客户端，封装 list_folder / download / upload
pub struct DropboxClient {
    conf: DropboxConfig,
    access_token: String,
    client: reqwest::Client,
}

impl DropboxClient {
    pub fn new(conf: DropboxConfig, access_token: String) -> Result<Self> {
        let client = build_http_client(conf.timeout)?;
        Ok(Self {
            conf,
            access_token,
            client,
        })
    }

    /// 刷新 token 并创建客户端
    pub async fn connect(conf: DropboxConfig, secrets: &Secrets) -> Result<Self> {
        let client = build_http_client(conf.timeout)?;
        let access_token = refresh_access_token(&client, &conf.token_url, secrets).await?;
        Ok(Self {
            conf,
            access_token,
            client,
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    async fn post_api(&self, endpoint: &str, body: Value) -> Result<reqwest::Response> {
        let url = format!("{}/2/{}", self.conf.api_base_url, endpoint);
        debug!("POST {} {}", url, body);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await?;
        ensure_success(response, endpoint).await
    }
}

#[async_trait]
impl RemoteStore for DropboxClient {
    async fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>> {
        let first: ListFolderResponse = self
            .post_api("files/list_folder", json!({ "path": folder }))
            .await?
            .json()
            .await?;

        let mut entries = first.entries;
        let mut cursor = first.cursor;
        let mut has_more = first.has_more;
        while has_more {
            let Some(c) = cursor.take() else { break };
            let page: ListFolderResponse = self
                .post_api("files/list_folder/continue", json!({ "cursor": c }))
                .await?
                .json()
                .await?;
            entries.extend(page.entries);
            cursor = page.cursor;
            has_more = page.has_more;
        }
        Ok(entries)
    }

    async fn download_file(&self, entry: &RemoteEntry, local_dir: &Path) -> Result<PathBuf> {
        let url = format!("{}/2/files/download", self.conf.content_base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Dropbox-API-Arg", api_arg(&json!({ "path": entry.path })))
            .send()
            .await?;
        let response = ensure_success(response, "files/download").await?;
        let bytes = response.bytes().await?;

        let local_path = local_dir.join(&entry.name);
        fs::write(&local_path, &bytes)?;
        Ok(local_path)
    }

    async fn upload(&self, local_file: &Path, remote_folder: &str) -> Result<String> {
        let name = local_file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::remote(format!("无效的上传文件名: {}", local_file.display())))?;
        let remote_path = join_remote(remote_folder, name);
        let data = fs::read(local_file)?;

        let url = format!("{}/2/files/upload", self.conf.content_base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .header(
                "Dropbox-API-Arg",
                api_arg(&json!({ "path": remote_path, "mode": "overwrite" })),
            )
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await?;
        let response = ensure_success(response, "files/upload").await.map_err(|e| {
            error!("❌ 上传 {} 失败: {}", local_file.display(), e);
            e
        })?;

        // 响应体只用于日志，解析失败时退回本地计算的路径
        let path = response
            .json::<UploadResponse>()
            .await
            .ok()
            .and_then(|r| r.path_display)
            .unwrap_or(remote_path);
        info!("📤 已上传 {}", path);
        Ok(path)
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Config(format!("创建 HTTP 客户端失败: {}", e)))
}

async fn ensure_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(PipelineError::remote_status(
        format!("{} failed with status {}: {}", what, status, text),
        status.as_u16(),
    ))
}

/// Dropbox-API-Arg 头只接受 ASCII，非 ASCII 字符转成 \uXXXX
pub fn api_arg(value: &Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
