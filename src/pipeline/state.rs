use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::review::questions::QUESTION_TYPES;

pub const STATE_VERSION: u32 = 1;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Start,
    ExtractText,
    DownloadProjects,
    ProcessProjects,
    Done,
}

impl Step {
    pub fn next(self) -> Step {
        match self {
            Step::Start => Step::ExtractText,
            Step::ExtractText => Step::DownloadProjects,
            Step::DownloadProjects => Step::ProcessProjects,
            Step::ProcessProjects => Step::Done,
            Step::Done => Step::Done,
        }
    }
}

/// 检查点记录，每完成一个工作单元就落盘一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub step: Step,
    #[serde(default = "one")]
    pub pdf_counter: usize,
    #[serde(default = "one")]
    pub project_counter: usize,
    #[serde(default = "one")]
    pub question_counter: usize,
    #[serde(default)]
    pub combined_answers: String,
    #[serde(default = "empty_buckets")]
    pub grouped_answers: Vec<Vec<String>>,
    #[serde(default)]
    pub reports: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Local>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Local>>,
    /// 收尾阶段使用的时间戳，重启后沿用同一个日志与报告文件名
    #[serde(default)]
    pub finalize_stamp: Option<String>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            step: Step::Start,
            pdf_counter: 1,
            project_counter: 1,
            question_counter: 1,
            combined_answers: String::new(),
            grouped_answers: empty_buckets(),
            reports: Vec::new(),
            completed: false,
            started_at: None,
            finished_at: None,
            finalize_stamp: None,
        }
    }
}

impl ProgressState {
    pub fn fresh(now: DateTime<Local>) -> Self {
        Self {
            started_at: Some(now),
            ..Self::default()
        }
    }

    pub fn advance(&mut self) {
        self.step = self.step.next();
    }

    /// 记录第 `question_index` 个问题的回答
    ///
    /// 回答去掉首尾空白和句末句号后以 ". " 追加到合并缓冲区，并放入 `(i - 1) % 8` 号分组。
    pub fn record_answer(&mut self, question_index: usize, answer: &str) {
        let cleaned = answer.trim().trim_end_matches('.').trim_end();
        if !self.combined_answers.is_empty() {
            self.combined_answers.push_str(". ");
        }
        self.combined_answers.push_str(cleaned);

        let bucket = bucket_index(question_index);
        self.grouped_answers[bucket].push(cleaned.to_string());
        self.question_counter = question_index + 1;
    }

    /// 当前项目完成：推进项目计数并清空项目内缓冲
    pub fn finish_project(&mut self, report_name: String) {
        if !self.reports.contains(&report_name) {
            self.reports.push(report_name);
        }
        self.project_counter += 1;
        self.reset_project_buffers();
    }

    pub fn reset_project_buffers(&mut self) {
        self.question_counter = 1;
        self.combined_answers.clear();
        self.grouped_answers = empty_buckets();
    }

    /// 全部完成：保留记录并打上 completed 标记，清空临时计数
    pub fn mark_completed(&mut self, now: DateTime<Local>) {
        self.step = Step::Done;
        self.completed = true;
        self.finished_at = Some(now);
        self.finalize_stamp = None;
        self.pdf_counter = 1;
        self.project_counter = 1;
        self.reports.clear();
        self.reset_project_buffers();
    }

    /// 修正旧版本或手工编辑导致的分组数量不对
    fn normalize(&mut self) {
        self.grouped_answers.resize_with(QUESTION_TYPES, Vec::new);
        self.pdf_counter = self.pdf_counter.max(1);
        self.project_counter = self.project_counter.max(1);
        self.question_counter = self.question_counter.max(1);
        self.version = STATE_VERSION;
    }
}

/// 第 i 个问题（从 1 开始）所属分组
pub fn bucket_index(question_index: usize) -> usize {
    (question_index.max(1) - 1) % QUESTION_TYPES
}

fn default_version() -> u32 {
    STATE_VERSION
}

fn one() -> usize {
    1
}

fn empty_buckets() -> Vec<Vec<String>> {
    vec![Vec::new(); QUESTION_TYPES]
}

/// JSON 检查点文件，写入时先写临时文件再 rename
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<ProgressState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut state: ProgressState =
            serde_json::from_str(&raw).map_err(|e| PipelineError::Checkpoint {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        state.normalize();
        debug!("已读取检查点: {:?}", state.step);
        Ok(Some(state))
    }

    /// 读取检查点；不存在或上次已完成时开始新一轮
    pub fn load_or_fresh(&self, now: DateTime<Local>) -> Result<ProgressState> {
        match self.load()? {
            Some(state) if !state.completed => {
                info!(
                    "♻️ 从检查点恢复: 阶段 {:?}，PDF {}，项目 {}，问题 {}",
                    state.step, state.pdf_counter, state.project_counter, state.question_counter
                );
                Ok(state)
            }
            Some(_) => {
                info!("上一轮已完成，开始新的一轮");
                Ok(ProgressState::fresh(now))
            }
            None => Ok(ProgressState::fresh(now)),
        }
    }

    pub fn save(&self, state: &ProgressState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| PipelineError::Checkpoint {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("progress.json");
        let tmp_path = self.path.with_file_name(format!("{}.tmp", file_name));
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
