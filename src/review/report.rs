use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::review::questions::QUESTION_TYPES;
use crate::review::summarize::Summarizer;
use crate::utils::text::sanitize_filename;

const LOG_FILE_PREFIX: &str = "Log file: ";

/// 单个项目的评审报告，上传后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub project_name: String,
    pub log_file: String,
    pub summary: String,
    pub grouped_summaries: Vec<String>,
}

impl ProjectReport {
    /// 由累积的回答生成报告：总摘要 + 每个分组空格拼接后的摘要
    pub fn build(
        project_name: &str,
        log_file: &str,
        combined_answers: &str,
        grouped_answers: &[Vec<String>],
        summarizer: &Summarizer,
    ) -> Self {
        let grouped_summaries = (0..QUESTION_TYPES)
            .map(|i| {
                let joined = grouped_answers
                    .get(i)
                    .map(|answers| answers.join(" "))
                    .unwrap_or_default();
                summarizer.summarize(&joined)
            })
            .collect();

        Self {
            project_name: project_name.to_string(),
            log_file: log_file.to_string(),
            summary: summarizer.summarize(combined_answers),
            grouped_summaries,
        }
    }

    /// 进行中的报告文件名
    pub fn file_name(&self) -> String {
        format!("result_{}.txt", sanitize_filename(&self.project_name))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}{}", LOG_FILE_PREFIX, self.log_file);
        out.push('\n');
        out.push_str("Summary:\n");
        let _ = writeln!(out, "{}", self.summary);
        out.push('\n');
        out.push_str("Grouped Answers:\n");
        for (j, summary) in self.grouped_summaries.iter().enumerate() {
            let _ = writeln!(out, "Question Type {}:", j + 1);
            let _ = writeln!(out, "{}", summary);
            out.push('\n');
        }
        out
    }

    /// 写入 `dir/<file_name>`，已存在则覆盖
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

/// 把报告首行的日志文件名换成 `log_name`，其余内容不变
pub fn relabel_log_file(content: &str, log_name: &str) -> String {
    match content.split_once('\n') {
        Some((first, rest)) if first.starts_with(LOG_FILE_PREFIX) => {
            format!("{}{}\n{}", LOG_FILE_PREFIX, log_name, rest)
        }
        _ => content.to_string(),
    }
}
