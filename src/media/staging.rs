//! # 视频暂存模块
//!
//! ## 设计思路
//!
//! 平台交付的视频文件只在回调期间有效，必须复制到私有临时位置。
//! 暂存文件由 `StagedFile` 持有：引用计数归零时自动删除，
//! 调用方若需要长期保留，显式调用 `persist` / `keep` 接管所有权。
//!
//! ## 实现思路
//!
//! - 基于 `tempfile::Builder` 生成唯一文件名，避免并发暂存冲突。
//! - 文件复制属于阻塞 I/O，放到 `spawn_blocking` 中执行。

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;

use super::MediaError;

const STAGED_FILE_PREFIX: &str = "picked-";

/// 暂存文件句柄，可廉价克隆；最后一个句柄释放时删除文件。
#[derive(Clone)]
pub struct StagedFile {
    path: Arc<TempPath>,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件扩展名（小写），用于推断格式。
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// 放弃自动删除，返回文件路径。仍有其他句柄存活时失败并原样返回。
    pub fn keep(self) -> Result<PathBuf, StagedFile> {
        match Arc::try_unwrap(self.path) {
            Ok(temp) => temp.keep().map_err(|e| StagedFile {
                path: Arc::new(e.path),
            }),
            Err(shared) => Err(StagedFile { path: shared }),
        }
    }

    /// 移动到调用方指定位置，之后不再自动删除。
    pub fn persist(self, target: &Path) -> Result<(), MediaError> {
        let temp = Arc::try_unwrap(self.path).map_err(|_| {
            MediaError::FileSystem("暂存文件仍被其他句柄引用，无法转移".to_string())
        })?;
        temp.persist(target)
            .map_err(|e| MediaError::FileSystem(format!("转移暂存文件失败：{}", e.error)))
    }
}

impl fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedFile")
            .field("path", &self.path())
            .finish()
    }
}

/// 暂存目录。
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir: dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// 复制源文件到暂存目录，保留原扩展名。
    pub async fn stage_copy(&self, source: &Path) -> Result<StagedFile, MediaError> {
        let dir = self.dir.clone();
        let source = source.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut input = std::fs::File::open(&source)
                .map_err(|e| MediaError::FileSystem(format!("无法打开视频文件：{}", e)))?;
            let suffix = extension_suffix(&source);
            let mut staged = Self::create_in(&dir, &suffix)?;
            std::io::copy(&mut input, staged.as_file_mut())
                .map_err(|e| MediaError::FileSystem(format!("复制视频到暂存目录失败：{}", e)))?;
            Ok(StagedFile {
                path: Arc::new(staged.into_temp_path()),
            })
        })
        .await?
    }

    /// 将内存中的字节写入暂存目录。
    pub async fn stage_bytes(
        &self,
        bytes: bytes::Bytes,
        extension: Option<&str>,
    ) -> Result<StagedFile, MediaError> {
        let dir = self.dir.clone();
        let suffix = extension.map(|ext| format!(".{}", ext)).unwrap_or_default();

        tokio::task::spawn_blocking(move || {
            use std::io::Write;

            let mut staged = Self::create_in(&dir, &suffix)?;
            staged
                .as_file_mut()
                .write_all(&bytes)
                .map_err(|e| MediaError::FileSystem(format!("写入暂存文件失败：{}", e)))?;
            Ok(StagedFile {
                path: Arc::new(staged.into_temp_path()),
            })
        })
        .await?
    }

    fn create_in(dir: &Path, suffix: &str) -> Result<tempfile::NamedTempFile, MediaError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| MediaError::FileSystem(format!("创建暂存目录失败：{}", e)))?;
        tempfile::Builder::new()
            .prefix(STAGED_FILE_PREFIX)
            .suffix(suffix)
            .tempfile_in(dir)
            .map_err(|e| MediaError::FileSystem(format!("创建暂存文件失败：{}", e)))
    }
}

fn extension_suffix(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
