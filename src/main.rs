use anyhow::{Context, Result};
use tracing::info;

use grant_align::app::{AppConfig, Secrets};
use grant_align::ask_llm::{LlmAnswerGenerator, LlmConfig};
use grant_align::dropbox::{DropboxClient, DropboxConfig};
use grant_align::logger;
use grant_align::pdf::PdfTextExtractor;
use grant_align::pipeline::Pipeline;
use grant_align::review::GrantQuestionBuilder;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logger::init();

    let config = AppConfig::from_env()?;
    let secrets = Secrets::from_env()?;

    info!("🚀 开始评审流程...");
    info!("☁️ 远端目录: {}", config.remote_folder);
    info!("💾 检查点: {}", config.progress_file.display());

    let store = DropboxClient::connect(DropboxConfig::from(&config), &secrets)
        .await
        .context("连接 Dropbox 失败")?;
    let generator = LlmAnswerGenerator::new(LlmConfig::from(&config));
    let questions = GrantQuestionBuilder::default();

    let pipeline = Pipeline::new(&config, &store, &PdfTextExtractor, &questions, &generator);
    let outcome = pipeline.run().await.context("评审流程中断，检查点已保留")?;

    info!(
        "🎉 处理完成! 共 {} 份报告，日志: {}",
        outcome.reports.len(),
        outcome.log_file.display()
    );
    Ok(())
}
