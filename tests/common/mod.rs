#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use grant_align::app::AppConfig;
use grant_align::ask_llm::AnswerGenerator;
use grant_align::pdf::TextExtractor;
use grant_align::review::QuestionBuilder;
use grant_align::storage::{EntryTag, RemoteEntry, RemoteStore, join_remote};
use grant_align::{PipelineError, Result};

pub const REMOTE: &str = "/GrantAlignTool";

/// 内存版远端存储，按完整路径保存文件
#[derive(Default)]
pub struct MemoryStore {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    pub uploads: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<String>>,
    /// 名称以此开头的上传直接失败，次数用完后恢复
    pub reject_uploads: Mutex<Option<(String, usize)>>,
    /// 名称以此开头的上传写入成功但返回错误，模拟响应丢失
    pub lose_upload_acks: Mutex<Option<(String, usize)>>,
}

impl MemoryStore {
    pub fn put(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.as_bytes().to_vec());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn upload_count(&self, path: &str) -> usize {
        self.uploads.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    fn take(slot: &Mutex<Option<(String, usize)>>, name: &str) -> bool {
        let mut slot = slot.lock().unwrap();
        if let Some((prefix, remaining)) = slot.as_mut() {
            if name.starts_with(prefix.as_str()) && *remaining > 0 {
                *remaining -= 1;
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>> {
        let folder = folder.trim_end_matches('/');
        let prefix = format!("{}/", folder);
        let mut entries = Vec::new();
        let mut folders = Vec::new();
        for path in self.files.lock().unwrap().keys() {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                None => entries.push(RemoteEntry {
                    tag: EntryTag::File,
                    name: rest.to_string(),
                    path: path.clone(),
                }),
                Some((sub, _)) if !folders.contains(&sub.to_string()) => {
                    folders.push(sub.to_string());
                }
                Some(_) => {}
            }
        }
        for sub in folders {
            entries.push(RemoteEntry {
                tag: EntryTag::Folder,
                path: join_remote(folder, &sub),
                name: sub,
            });
        }
        Ok(entries)
    }

    async fn download_file(&self, entry: &RemoteEntry, local_dir: &Path) -> Result<PathBuf> {
        let bytes = self
            .files
            .lock()
            .unwrap()
            .get(&entry.path)
            .cloned()
            .ok_or_else(|| PipelineError::remote_status("not_found", 409))?;
        self.downloads.lock().unwrap().push(entry.path.clone());
        let local = local_dir.join(&entry.name);
        fs::write(&local, bytes)?;
        Ok(local)
    }

    async fn upload(&self, local_file: &Path, remote_folder: &str) -> Result<String> {
        let name = local_file.file_name().unwrap().to_string_lossy().into_owned();
        if Self::take(&self.reject_uploads, &name) {
            return Err(PipelineError::remote_status("upload rejected", 503));
        }
        let path = join_remote(remote_folder, &name);
        let data = fs::read(local_file)?;
        self.files.lock().unwrap().insert(path.clone(), data);
        self.uploads.lock().unwrap().push(path.clone());
        if Self::take(&self.lose_upload_acks, &name) {
            return Err(PipelineError::remote("connection reset after upload"));
        }
        Ok(path)
    }
}

/// 把文件内容当作文本的提取器
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, pdf_path: &Path) -> Result<String> {
        fs::read_to_string(pdf_path).map_err(|e| PipelineError::Extract {
            path: pdf_path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// 固定返回 Q1..Qn
pub struct FixedQuestions(pub usize);

impl QuestionBuilder for FixedQuestions {
    fn build(&self, _project_text: &str, _corpus_text: &str) -> Vec<String> {
        (1..=self.0).map(|i| format!("Q{}", i)).collect()
    }
}

/// 对 Qi 回答 Ai，可在指定问题上失败
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail_on: Option<usize>,
    pub asked: Mutex<Vec<usize>>,
    pub contexts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn failing_on(i: usize) -> Self {
        Self {
            fail_on: Some(i),
            ..Self::default()
        }
    }

    pub fn asked(&self) -> Vec<usize> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let i: usize = question.trim_start_matches('Q').parse().unwrap_or(0);
        if self.fail_on == Some(i) {
            return Err(PipelineError::Model(format!("inference failed on Q{}", i)));
        }
        self.asked.lock().unwrap().push(i);
        self.contexts.lock().unwrap().push(context.to_string());
        Ok(format!("A{}", i))
    }
}

pub fn config_in(root: &Path) -> AppConfig {
    AppConfig {
        remote_folder: REMOTE.to_string(),
        pdf_dir: root.join("pdfs"),
        projects_dir: root.join("Projects"),
        summary_dir: root.join("summary"),
        progress_file: root.join("progress.json"),
        ..AppConfig::default()
    }
}

/// 两份参考语料 + 给定的项目
pub fn seeded_store(projects: &[&str]) -> MemoryStore {
    let store = MemoryStore::default();
    store.put(&format!("{}/ref1.pdf", REMOTE), "Reference one");
    store.put(&format!("{}/ref2.pdf", REMOTE), "Reference two");
    for name in projects {
        store.put(
            &format!("{}/Projects/{}.pdf", REMOTE, name),
            &format!("{} project text", name),
        );
    }
    store
}
