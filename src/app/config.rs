use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::review::summarize::SentencePolicy;

pub const CONFIG_PATH_ENV: &str = "GRANT_ALIGN_CONFIG";
pub const APP_KEY_ENV: &str = "DROPBOX_APP_KEY";
pub const APP_SECRET_ENV: &str = "DROPBOX_APP_SECRET";
pub const REFRESH_TOKEN_ENV: &str = "DROPBOX_REFRESH_TOKEN";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_remote_folder")]
    pub remote_folder: String,
    #[serde(default = "default_projects_subfolder")]
    pub remote_projects_subfolder: String,
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: PathBuf,
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,
    #[serde(default = "default_summary_dir")]
    pub summary_dir: PathBuf,
    #[serde(default = "default_progress_file")]
    pub progress_file: PathBuf,
    #[serde(default = "default_file_list_name")]
    pub file_list_name: String,
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,
    #[serde(default)]
    pub sentence_policy: SentencePolicy,
    #[serde(default = "default_condense_every")]
    pub condense_every: usize,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_content_base_url")]
    pub content_base_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_model_base_url")]
    pub model_base_url: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_model_api_key")]
    pub model_api_key: String,
    #[serde(default)]
    pub model_system_message: Option<String>,
}

impl AppConfig {
    /// 读取配置文件；文件不存在时使用默认值
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.unwrap_or_else(|| Path::new("config.toml"));
        if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            let cfg: AppConfig = toml::from_str(&raw)
                .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
            return Ok(cfg);
        }
        Ok(AppConfig::default())
    }

    /// 按 GRANT_ALIGN_CONFIG 指定的路径读取配置
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load(path.as_deref())
    }

    pub fn remote_projects_folder(&self) -> String {
        format!(
            "{}/{}",
            self.remote_folder.trim_end_matches('/'),
            self.remote_projects_subfolder.trim_matches('/')
        )
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_folder: default_remote_folder(),
            remote_projects_subfolder: default_projects_subfolder(),
            pdf_dir: default_pdf_dir(),
            projects_dir: default_projects_dir(),
            summary_dir: default_summary_dir(),
            progress_file: default_progress_file(),
            file_list_name: default_file_list_name(),
            summary_sentences: default_summary_sentences(),
            sentence_policy: SentencePolicy::default(),
            condense_every: default_condense_every(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            content_base_url: default_content_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            model_base_url: default_model_base_url(),
            model_name: default_model_name(),
            model_api_key: default_model_api_key(),
            model_system_message: None,
        }
    }
}

/// Dropbox 应用凭证，只从环境变量读取
#[derive(Clone)]
pub struct Secrets {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> std::result::Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PipelineError::Config(format!("缺少环境变量 {}", key)))
        };
        Ok(Self {
            app_key: require(APP_KEY_ENV)?,
            app_secret: require(APP_SECRET_ENV)?,
            refresh_token: require(REFRESH_TOKEN_ENV)?,
        })
    }
}

fn default_remote_folder() -> String {
    "/GrantAlignTool".to_string()
}

fn default_projects_subfolder() -> String {
    "Projects".to_string()
}

fn default_pdf_dir() -> PathBuf {
    PathBuf::from("pdfs")
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("Projects")
}

fn default_summary_dir() -> PathBuf {
    PathBuf::from("summary")
}

fn default_progress_file() -> PathBuf {
    PathBuf::from("progress.json")
}

fn default_file_list_name() -> String {
    "file_list.txt".to_string()
}

fn default_summary_sentences() -> usize {
    10
}

fn default_condense_every() -> usize {
    10
}

fn default_token_url() -> String {
    "https://api.dropbox.com/oauth2/token".to_string()
}

fn default_api_base_url() -> String {
    "https://api.dropboxapi.com".to_string()
}

fn default_content_base_url() -> String {
    "https://content.dropboxapi.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    300
}

fn default_model_base_url() -> String {
    // GPT4All 本地 API 服务
    "http://localhost:4891/v1/".to_string()
}

fn default_model_name() -> String {
    "Meta-Llama-3-8B-Instruct.Q4_0.gguf".to_string()
}

fn default_model_api_key() -> String {
    "not-needed".to_string()
}
