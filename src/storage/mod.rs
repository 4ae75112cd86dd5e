use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;

/// 远端条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryTag {
    File,
    Folder,
    #[serde(other)]
    Other,
}

/// 远端文件夹列表中的一项，只反映远端状态，不落盘
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    #[serde(rename = ".tag")]
    pub tag: EntryTag,
    pub name: String,
    #[serde(rename = "path_lower", default)]
    pub path: String,
}

impl RemoteEntry {
    pub fn file(folder: &str, name: &str) -> Self {
        Self {
            tag: EntryTag::File,
            name: name.to_string(),
            path: join_remote(folder, name).to_lowercase(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.tag == EntryTag::File
    }
}

/// 文件夹式远端存储：列表、下载、覆盖上传
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>>;

    /// 下载单个文件到 `local_dir/<name>`，返回本地路径
    async fn download_file(&self, entry: &RemoteEntry, local_dir: &Path) -> Result<PathBuf>;

    /// 以覆盖模式上传，返回远端路径
    async fn upload(&self, local_file: &Path, remote_folder: &str) -> Result<String>;
}

/// 拼接远端路径，保证只有一个分隔符
pub fn join_remote(folder: &str, name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// 下载远端文件夹中的所有文件
///
/// 单个文件下载失败只记录警告并跳过，列表失败则直接返回错误。
/// 给出 `file_list_path` 时把成功下载的文件名逐行写入。
pub async fn download_folder<S>(
    store: &S,
    folder: &str,
    local_dir: &Path,
    file_list_path: Option<&Path>,
) -> Result<Vec<String>>
where
    S: RemoteStore + ?Sized,
{
    fs::create_dir_all(local_dir)?;
    let entries = store.list(folder).await?;
    info!("📂 远端目录 {} 共 {} 项", folder, entries.len());

    let mut downloaded = Vec::new();
    for entry in entries.iter().filter(|e| e.is_file()) {
        match store.download_file(entry, local_dir).await {
            Ok(path) => {
                info!("📥 已下载 {} -> {}", entry.name, path.display());
                downloaded.push(entry.name.clone());
            }
            Err(e) => {
                warn!("⚠️ 下载 {} 失败，跳过: {}", entry.name, e);
            }
        }
    }

    if let Some(list_path) = file_list_path {
        let mut content = downloaded.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(list_path, content)?;
    }

    Ok(downloaded)
}
