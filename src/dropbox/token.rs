use serde::Deserialize;
use tracing::{debug, error, info};

use crate::app::Secrets;
use crate::error::{PipelineError, Result};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// 用长期有效的 refresh token 换取短期 access token
///
/// 非成功状态直接返回 [`PipelineError::Auth`]，不做重试。
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    secrets: &Secrets,
) -> Result<String> {
    info!("🔑 正在刷新 access token...");
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", secrets.refresh_token.as_str()),
        ("client_id", secrets.app_key.as_str()),
        ("client_secret", secrets.app_secret.as_str()),
    ];

    let response = client
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| PipelineError::Auth(format!("请求 token 接口失败: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        error!("❌ 刷新 access token 失败: {} {}", status, text);
        return Err(PipelineError::Auth(format!(
            "Failed to refresh access token: {} {}",
            status, text
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| PipelineError::Auth(format!("解析 token 响应失败: {}", e)))?;
    debug!("access token 有效期: {:?} 秒", token.expires_in);
    info!("✅ access token 已刷新");
    Ok(token.access_token)
}
