use std::path::PathBuf;
use thiserror::Error;

/// 流水线各阶段的错误分类
///
/// 没有任何一种错误会被自动重试：恢复手段只有重启进程并从检查点继续。
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 刷新令牌换取访问令牌失败
    #[error("auth error: {0}")]
    Auth(String),

    /// 远端存储 list / download / upload 返回非成功状态
    #[error("remote error: {message}")]
    Remote {
        message: String,
        status: Option<u16>,
    },

    /// PDF 无法解析
    #[error("extract error ({}): {message}", path.display())]
    Extract { path: PathBuf, message: String },

    /// 模型推理失败或返回空内容
    #[error("model error: {0}")]
    Model(String),

    /// 缺少必需的环境变量或配置文件无效
    #[error("config error: {0}")]
    Config(String),

    /// 检查点文件无法解析或写入
    #[error("checkpoint error ({}): {message}", path.display())]
    Checkpoint { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            status: None,
        }
    }

    pub fn remote_status(message: impl Into<String>, status: u16) -> Self {
        Self::Remote {
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        Self::Remote {
            message: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
