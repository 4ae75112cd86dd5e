use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// 进行中的运行日志文件名，完成后重命名为 `log_<时间戳>.txt`
pub const CURRENT_LOG_NAME: &str = "current_log.txt";

/// 给人看的运行日志，追加写入，每行立即 flush
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn open(dir: &Path) -> Result<Self> {
        Self::open_named(dir, CURRENT_LOG_NAME)
    }

    pub fn open_named(dir: &Path, name: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&mut self, message: impl AsRef<str>) -> Result<()> {
        writeln!(self.file, "{}", message.as_ref())?;
        self.file.flush()?;
        Ok(())
    }

    /// 关闭并把日志改名为 `new_name`，返回新路径
    ///
    /// 目标已存在（上次收尾中途失败）时把本次内容追加到目标末尾。
    pub fn finalize(self, new_name: &str) -> Result<PathBuf> {
        let Self { path, file } = self;
        file.sync_all()?;
        drop(file);
        let target = path.with_file_name(new_name);
        if target.exists() {
            let rest = fs::read(&path)?;
            let mut out = OpenOptions::new().append(true).open(&target)?;
            out.write_all(&rest)?;
            out.sync_all()?;
            fs::remove_file(&path)?;
        } else {
            fs::rename(&path, &target)?;
        }
        Ok(target)
    }
}
