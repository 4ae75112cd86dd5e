use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// PDF 转纯文本
pub trait TextExtractor: Send + Sync {
    fn extract(&self, pdf_path: &Path) -> Result<String>;
}

/// 基于 pdf-extract 的纯 Rust 实现
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, pdf_path: &Path) -> Result<String> {
        let text = pdf_extract::extract_text(pdf_path).map_err(|e| PipelineError::Extract {
            path: pdf_path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("已提取 {}: {} 字符", pdf_path.display(), text.len());
        Ok(text)
    }
}

/// 列出目录下的 PDF，按文件名排序保证每次运行顺序一致
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    if !dir.exists() {
        return Ok(pdfs);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if path.is_file() && is_pdf {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}
