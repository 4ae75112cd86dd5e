use anyhow::{Context, Result};
use tracing::info;

use grant_align::aggregate::Aggregator;
use grant_align::app::{AppConfig, Secrets};
use grant_align::ask_llm::{LlmAnswerGenerator, LlmConfig};
use grant_align::dropbox::{DropboxClient, DropboxConfig};
use grant_align::logger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logger::init();

    let config = AppConfig::from_env()?;
    let secrets = Secrets::from_env()?;

    let store = DropboxClient::connect(DropboxConfig::from(&config), &secrets)
        .await
        .context("连接 Dropbox 失败")?;
    let generator = LlmAnswerGenerator::new(LlmConfig::from(&config));

    let outcome = Aggregator::new(&config, &store, &generator)
        .run()
        .await
        .context("汇总失败")?;

    info!(
        "🎉 汇总了 {} 个结果文件: {}",
        outcome.result_files, outcome.remote_path
    );
    Ok(())
}
