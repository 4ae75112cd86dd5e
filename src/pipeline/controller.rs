use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::app::AppConfig;
use crate::ask_llm::AnswerGenerator;
use crate::error::Result;
use crate::pdf::{TextExtractor, list_pdfs};
use crate::pipeline::run_log::{CURRENT_LOG_NAME, RunLog};
use crate::pipeline::state::{CheckpointStore, ProgressState, Step};
use crate::review::questions::QuestionBuilder;
use crate::review::report::{ProjectReport, relabel_log_file};
use crate::review::summarize::Summarizer;
use crate::storage::{RemoteStore, download_folder};
use crate::utils::text::{file_stem, timestamp};

/// 提取文本的缓存目录（位于 PDF 目录下）
pub const TEXT_CACHE_DIR: &str = "text";

/// 一轮完整运行的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub log_file: PathBuf,
    pub reports: Vec<PathBuf>,
}

/// 可恢复的批处理流水线
///
/// 每个阶段的进度都保存在 [`ProgressState`] 中，任何错误都会直接向上返回，
/// 检查点停留在最后一次成功保存的位置，重启后从下一个工作单元继续。
pub struct Pipeline<'a> {
    config: &'a AppConfig,
    store: &'a dyn RemoteStore,
    extractor: &'a dyn TextExtractor,
    questions: &'a dyn QuestionBuilder,
    generator: &'a dyn AnswerGenerator,
    summarizer: Summarizer,
    checkpoint: CheckpointStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a AppConfig,
        store: &'a dyn RemoteStore,
        extractor: &'a dyn TextExtractor,
        questions: &'a dyn QuestionBuilder,
        generator: &'a dyn AnswerGenerator,
    ) -> Self {
        Self {
            config,
            store,
            extractor,
            questions,
            generator,
            summarizer: Summarizer::new(config.summary_sentences, config.sentence_policy),
            checkpoint: CheckpointStore::new(&config.progress_file),
        }
    }

    pub fn checkpoint(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        fs::create_dir_all(&self.config.pdf_dir)?;
        fs::create_dir_all(&self.config.projects_dir)?;

        let mut state = self.checkpoint.load_or_fresh(Local::now())?;
        self.checkpoint.save(&state)?;

        let mut log = RunLog::open(&self.config.pdf_dir)?;
        log.line(format!("Dropbox folder: {}", self.config.remote_folder))?;
        log.line(format!("Local PDF folder: {}", self.config.pdf_dir.display()))?;
        log.line(format!("Projects folder: {}", self.config.projects_dir.display()))?;

        loop {
            debug!("当前阶段: {:?}", state.step);
            match state.step {
                Step::Start => self.download_corpus(&mut state, &mut log).await?,
                Step::ExtractText => self.extract_corpus(&mut state, &mut log)?,
                Step::DownloadProjects => self.download_projects(&mut state, &mut log).await?,
                Step::ProcessProjects => self.process_projects(&mut state, &mut log).await?,
                Step::Done => return self.finalize(&mut state, log).await,
            }
        }
    }

    fn text_cache_dir(&self) -> PathBuf {
        self.config.pdf_dir.join(TEXT_CACHE_DIR)
    }

    fn file_list_path(&self) -> PathBuf {
        self.config.pdf_dir.join(&self.config.file_list_name)
    }

    async fn download_corpus(&self, state: &mut ProgressState, log: &mut RunLog) -> Result<()> {
        info!("📚 下载参考语料: {}", self.config.remote_folder);
        let names = download_folder(
            self.store,
            &self.config.remote_folder,
            &self.config.pdf_dir,
            None,
        )
        .await?;
        log.line(format!("Downloaded {} files from {}", names.len(), self.config.remote_folder))?;

        state.advance();
        self.checkpoint.save(state)
    }

    fn extract_corpus(&self, state: &mut ProgressState, log: &mut RunLog) -> Result<()> {
        let pdfs = list_pdfs(&self.config.pdf_dir)?;
        let cache_dir = self.text_cache_dir();
        fs::create_dir_all(&cache_dir)?;

        for (idx, path) in pdfs.iter().enumerate() {
            let n = idx + 1;
            if n < state.pdf_counter {
                continue;
            }
            info!("📄 正在处理 PDF {}/{}: {}", n, pdfs.len(), path.display());
            let text = self.extractor.extract(path)?;
            fs::write(cache_dir.join(format!("{}.txt", file_stem(path))), &text)?;
            log.line(format!("Extracted PDF {}: {} ({} chars)", n, path.display(), text.len()))?;

            state.pdf_counter = n + 1;
            self.checkpoint.save(state)?;
        }

        state.advance();
        self.checkpoint.save(state)
    }

    /// 按顺序拼接已提取的语料；缓存缺失时重新提取
    fn load_corpus(&self, state: &ProgressState) -> Result<String> {
        let pdfs = list_pdfs(&self.config.pdf_dir)?;
        let cache_dir = self.text_cache_dir();
        let extracted = state.pdf_counter.saturating_sub(1).min(pdfs.len());

        let mut corpus = String::new();
        for path in &pdfs[..extracted] {
            let cache = cache_dir.join(format!("{}.txt", file_stem(path)));
            let text = match fs::read_to_string(&cache) {
                Ok(text) => text,
                Err(_) => {
                    warn!("⚠️ 缺少文本缓存 {}，重新提取", cache.display());
                    let text = self.extractor.extract(path)?;
                    fs::create_dir_all(&cache_dir)?;
                    fs::write(&cache, &text)?;
                    text
                }
            };
            corpus.push_str(&text);
            corpus.push('\n');
        }
        Ok(corpus)
    }

    async fn download_projects(&self, state: &mut ProgressState, log: &mut RunLog) -> Result<()> {
        let remote_projects = self.config.remote_projects_folder();
        info!("📁 下载项目文件: {}", remote_projects);
        let list_path = self.file_list_path();
        let names = download_folder(
            self.store,
            &remote_projects,
            &self.config.projects_dir,
            Some(&list_path),
        )
        .await?;
        log.line(format!("Downloaded {} project files from {}", names.len(), remote_projects))?;

        // 汇总程序根据这个文件命名最终报告
        self.store.upload(&list_path, &self.config.remote_folder).await?;

        state.advance();
        self.checkpoint.save(state)
    }

    async fn process_projects(&self, state: &mut ProgressState, log: &mut RunLog) -> Result<()> {
        let corpus = self.load_corpus(state)?;
        log.line(format!("Corpus text: {} chars", corpus.len()))?;
        log.line("Starting to process project files...")?;

        let projects = list_pdfs(&self.config.projects_dir)?;
        for (idx, path) in projects.iter().enumerate() {
            let p = idx + 1;
            if p < state.project_counter {
                continue;
            }
            info!("🗂️ 项目 {}/{}: {}", p, projects.len(), path.display());
            self.process_project(state, log, path, &corpus).await?;
        }

        state.advance();
        self.checkpoint.save(state)
    }

    async fn process_project(
        &self,
        state: &mut ProgressState,
        log: &mut RunLog,
        path: &Path,
        corpus: &str,
    ) -> Result<()> {
        let project_name = file_stem(path);
        let project_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| project_name.clone());
        let project_text = self.extractor.extract(path)?;
        let questions = self.questions.build(&project_text, corpus);
        if state.question_counter > questions.len() + 1 {
            warn!(
                "⚠️ 检查点问题序号 {} 超出问题数 {}，视为全部已回答",
                state.question_counter,
                questions.len()
            );
        }
        let context = format!("Project: {}", project_name);

        for (idx, question) in questions.iter().enumerate() {
            let i = idx + 1;
            if i < state.question_counter {
                continue;
            }
            log.line(format!("Built question {} for {}: {}", i, project_file, question))?;
            let answer = self.generator.answer(question, &context).await?;
            log.line(format!("Answer for question {} for {}: {}", i, project_file, answer))?;

            state.record_answer(i, &answer);
            if self.config.condense_every > 0 && i % self.config.condense_every == 0 {
                state.combined_answers = self.summarizer.summarize(&state.combined_answers);
            }
            self.checkpoint.save(state)?;
            info!("✅ 项目 {} 问题 {}/{} 已回答", state.project_counter, i, questions.len());
        }

        let report = ProjectReport::build(
            &project_name,
            CURRENT_LOG_NAME,
            &state.combined_answers,
            &state.grouped_answers,
            &self.summarizer,
        );
        let report_path = report.write_to(&self.config.pdf_dir)?;
        // 上传失败直接中止，检查点仍停在本项目，重启后会重新生成并覆盖上传
        self.store.upload(&report_path, &self.config.remote_folder).await?;
        log.line(format!("Uploaded report {}", report.file_name()))?;

        info!("🎉 项目 {} 完成: {}", state.project_counter, project_name);
        state.finish_project(report.file_name());
        self.checkpoint.save(state)
    }

    async fn finalize(&self, state: &mut ProgressState, mut log: RunLog) -> Result<RunOutcome> {
        let now = Local::now();
        // 时间戳先落盘，上传失败重启后仍写入同一个日志文件
        let stamp = match &state.finalize_stamp {
            Some(stamp) => stamp.clone(),
            None => {
                let stamp = timestamp(now);
                state.finalize_stamp = Some(stamp.clone());
                self.checkpoint.save(state)?;
                stamp
            }
        };
        log.line(format!("Run completed at {}", timestamp(now)))?;

        let log_name = format!("log_{}.txt", stamp);
        let log_file = log.finalize(&log_name)?;
        self.store.upload(&log_file, &self.config.remote_folder).await?;

        let mut reports = Vec::new();
        for name in &state.reports {
            let current = self.config.pdf_dir.join(name);
            let finalized = self
                .config
                .pdf_dir
                .join(format!("{}_{}.txt", file_stem(&current), stamp));
            if current.exists() {
                let content = fs::read_to_string(&current)?;
                fs::write(&finalized, relabel_log_file(&content, &log_name))?;
                fs::remove_file(&current)?;
            }
            if finalized.exists() {
                reports.push(finalized);
            }
        }

        state.mark_completed(now);
        self.checkpoint.save(state)?;
        info!("🏁 全部完成，日志: {}", log_file.display());

        Ok(RunOutcome { log_file, reports })
    }
}
