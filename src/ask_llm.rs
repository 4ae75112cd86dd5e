use async_trait::async_trait;
use openai::Credentials;
use openai::chat::{ChatCompletion, ChatCompletionMessage, ChatCompletionMessageRole};
use tracing::{debug, warn};

use crate::app::AppConfig;
use crate::error::{PipelineError, Result};

/// 向语言模型提问并取回文本回答
///
/// 没有重试：失败直接返回 [`PipelineError::Model`]，由调用方中止当前项目。
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<String>;
}

/// LLM 请求配置
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API 密钥，本地模型服务通常忽略
    pub api_key: String,
    /// OpenAI 兼容接口地址，例如 GPT4All 本地服务
    pub api_base_url: String,
    /// 模型名称
    pub model_name: String,
    /// 系统消息
    pub system_message: Option<String>,
}

impl From<&AppConfig> for LlmConfig {
    fn from(app: &AppConfig) -> Self {
        Self {
            api_key: app.model_api_key.clone(),
            api_base_url: app.model_base_url.clone(),
            model_name: app.model_name.clone(),
            system_message: app.model_system_message.clone(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// 通过 OpenAI 兼容的 chat 接口调用本地模型
#[derive(Debug, Clone)]
pub struct LlmAnswerGenerator {
    config: LlmConfig,
}

impl LlmAnswerGenerator {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }

    fn system_prompt(&self, context: &str) -> Option<String> {
        let base = self.config.system_message.as_deref().unwrap_or("").trim();
        let context = context.trim();
        match (base.is_empty(), context.is_empty()) {
            (true, true) => None,
            (false, true) => Some(base.to_string()),
            (true, false) => Some(context.to_string()),
            (false, false) => Some(format!("{}\n\n{}", base, context)),
        }
    }
}

fn message(role: ChatCompletionMessageRole, content: String) -> ChatCompletionMessage {
    ChatCompletionMessage {
        role,
        content: Some(content),
        name: None,
        function_call: None,
        tool_call_id: None,
        tool_calls: None,
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        debug!("正在调用 LLM API，模型: {}", self.config.model_name);
        debug!("用户消息: {}", question);

        let credentials = Credentials::new(&self.config.api_key, &self.config.api_base_url);

        let mut messages = Vec::new();
        if let Some(system_msg) = self.system_prompt(context) {
            messages.push(message(ChatCompletionMessageRole::System, system_msg));
        }
        messages.push(message(ChatCompletionMessageRole::User, question.to_string()));

        let chat_completion = ChatCompletion::builder(&self.config.model_name, messages)
            .credentials(credentials)
            .create()
            .await
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                PipelineError::Model(format!("LLM API 调用失败: {}", e))
            })?;

        debug!("LLM API 调用成功");

        let content = chat_completion
            .choices
            .first()
            .ok_or_else(|| PipelineError::Model("LLM 返回结果为空".to_string()))?
            .message
            .content
            .clone()
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(PipelineError::Model("LLM 返回内容为空".to_string()));
        }
        Ok(content.to_string())
    }
}
