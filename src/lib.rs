//! 基金申请材料对齐评审的批处理流水线
//!
//! 从 Dropbox 拉取参考语料与项目 PDF，逐项目提问本地模型，生成报告并上传；
//! 进度保存在 JSON 检查点中，进程中断后可从下一个工作单元继续。

pub mod aggregate;
pub mod app;
pub mod ask_llm;
pub mod dropbox;
pub mod error;
pub mod logger;
pub mod pdf;
pub mod pipeline;
pub mod review;
pub mod storage;
pub mod utils;

pub use error::{PipelineError, Result};
