use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::AppConfig;
use crate::ask_llm::AnswerGenerator;
use crate::error::{PipelineError, Result};
use crate::pipeline::run_log::RunLog;
use crate::storage::{RemoteStore, download_folder};
use crate::utils::text::{file_stem, sanitize_filename, timestamp};

/// 最终汇总文件名后缀
pub const SUMMARY_SUFFIX: &str = "_project_grant_alignment_summary.txt";

/// 汇总文件名前缀的最大字节数，加上后缀仍低于常见的 255 字节文件名上限
pub const MAX_MARKER_BYTES: usize = 150;

const SUMMARY_INSTRUCTION: &str = "You are given the grant alignment results of several projects. \
Summarize the overall alignment, the recurring strengths and the recurring gaps.";

/// 汇总运行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub result_files: usize,
    pub summary_file: PathBuf,
    pub remote_path: String,
}

/// 跨项目汇总：下载各项目报告，拼接后交给模型总结，再上传一份汇总文件
pub struct Aggregator<'a> {
    config: &'a AppConfig,
    store: &'a dyn RemoteStore,
    generator: &'a dyn AnswerGenerator,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        config: &'a AppConfig,
        store: &'a dyn RemoteStore,
        generator: &'a dyn AnswerGenerator,
    ) -> Self {
        Self {
            config,
            store,
            generator,
        }
    }

    pub async fn run(&self) -> Result<AggregateOutcome> {
        let dir = &self.config.summary_dir;
        download_folder(self.store, &self.config.remote_folder, dir, None).await?;

        let result_files = collect_result_files(dir)?;
        info!("🧾 共找到 {} 个结果文件", result_files.len());

        let mut text_to_summary = String::new();
        for path in &result_files {
            text_to_summary.push_str(&fs::read_to_string(path)?);
            text_to_summary.push(' ');
        }

        let ts = timestamp(Local::now());
        let mut log = RunLog::open_named(dir, &format!("log_summary_{}.txt", ts))?;
        for path in &result_files {
            log.line(format!("Result file: {}", path.display()))?;
        }
        let summary = self
            .generator
            .answer(&text_to_summary, SUMMARY_INSTRUCTION)
            .await?;
        log.line(format!("Summary: {}", summary))?;

        let marker = read_marker(&dir.join(&self.config.file_list_name))?;
        let summary_file = dir.join(format!("{}{}", marker, SUMMARY_SUFFIX));
        fs::write(
            &summary_file,
            format!(
                "Summarized {} result files\n\nSummary:\n{}",
                result_files.len(),
                summary
            ),
        )?;

        let remote_path = self
            .store
            .upload(&summary_file, &self.config.remote_folder)
            .await?;
        log.line(format!("Uploaded {}", remote_path))?;
        info!("✅ 汇总已上传: {}", remote_path);

        Ok(AggregateOutcome {
            result_files: result_files.len(),
            summary_file,
            remote_path,
        })
    }
}

/// 名字包含 `result` 且以 `.txt` 结尾的文件，按名称排序
pub fn collect_result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.contains("result") && name.ends_with(".txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// 从文件列表推出汇总文件名前缀：各行去扩展名后用 `_` 连接
///
/// 超过 [`MAX_MARKER_BYTES`] 时只保留能放下的前几项，后面接 `_and_<n>_more`。
pub fn summary_marker(file_list: &str) -> String {
    let stems: Vec<String> = file_list
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| sanitize_filename(&file_stem(Path::new(l))))
        .filter(|s| !s.is_empty())
        .collect();
    if stems.is_empty() {
        return "projects".to_string();
    }

    let mut marker = String::new();
    let mut used = 0;
    for stem in &stems {
        let sep = if marker.is_empty() { 0 } else { 1 };
        if marker.len() + sep + stem.len() > MAX_MARKER_BYTES {
            break;
        }
        if sep == 1 {
            marker.push('_');
        }
        marker.push_str(stem);
        used += 1;
    }
    if used == 0 {
        let first = &stems[0];
        let mut end = MAX_MARKER_BYTES.min(first.len());
        while !first.is_char_boundary(end) {
            end -= 1;
        }
        marker = first[..end].to_string();
        used = 1;
    }
    if used < stems.len() {
        marker.push_str(&format!("_and_{}_more", stems.len() - used));
    }
    marker
}

fn read_marker(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::Config(format!("读取文件列表 {} 失败: {}", path.display(), e))
    })?;
    Ok(summary_marker(&content))
}
