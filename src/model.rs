//! # 结果模型
//!
//! ## 设计思路
//!
//! 无论来源是相机、相册还是文档，交付给调用方的都是统一的 `NormalizedFile`。
//! `FileKind` 保证三种负载互斥；图片/视频中的尺寸永远是归一化后的尺寸。
//!
//! `SelectionResult` 同时携带成功文件与单项失败原因：
//! 失败不会中断整批，也不会作为错误返回，但调用方可以据此提示用户。

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Local};
use image::DynamicImage;

use crate::media::{MediaError, StagedFile};
use crate::policy::PixelSize;

/// 文件格式标识（MIME + 扩展名）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatTag {
    pub mime_type: String,
    pub extension: String,
}

impl FormatTag {
    pub fn jpeg() -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            extension: "jpg".to_string(),
        }
    }

    /// 根据扩展名推断格式。
    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        let mime_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "heif" => "image/heif",
            "tif" | "tiff" => "image/tiff",
            "bmp" => "image/bmp",
            "mov" => "video/quicktime",
            "mp4" => "video/mp4",
            "m4v" => "video/x-m4v",
            "webm" => "video/webm",
            "mkv" => "video/x-matroska",
            "avi" => "video/x-msvideo",
            "pdf" => "application/pdf",
            "zip" => "application/zip",
            "json" => "application/json",
            "txt" => "text/plain",
            "csv" => "text/csv",
            "md" => "text/markdown",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "xls" => "application/vnd.ms-excel",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            _ => return None,
        };

        Some(Self {
            mime_type: mime_type.to_string(),
            extension,
        })
    }

    /// 通过文件头魔数识别格式。
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        infer::get(bytes).map(|kind| Self {
            mime_type: kind.mime_type().to_string(),
            extension: kind.extension().to_string(),
        })
    }

    /// 扩展名优先，其次魔数。
    pub fn resolve(extension: Option<&str>, bytes: &[u8]) -> Option<Self> {
        extension
            .and_then(Self::from_extension)
            .or_else(|| Self::sniff(bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

#[derive(Debug, Clone)]
pub struct ImageFile {
    pub data: Bytes,
    pub image: Arc<DynamicImage>,
    pub size: PixelSize,
    pub format: FormatTag,
}

#[derive(Debug, Clone)]
pub struct VideoFile {
    /// 暂存的视频文件；最后一个句柄释放时删除。
    pub location: Option<StagedFile>,
    pub data: Bytes,
    pub preview_data: Bytes,
    pub preview_image: Arc<DynamicImage>,
    /// 视频分辨率（已应用轨道变换，无法解析时取预览帧尺寸）。
    pub size: PixelSize,
    pub preview_size: PixelSize,
    pub format: Option<FormatTag>,
    pub preview_format: FormatTag,
}

#[derive(Debug, Clone)]
pub struct OtherFile {
    pub data: Bytes,
    pub format: Option<FormatTag>,
}

#[derive(Debug, Clone)]
pub enum FileKind {
    Image(ImageFile),
    Video(VideoFile),
    Other(OtherFile),
}

/// 归一化后的单个文件。
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Local>,
    pub kind: FileKind,
}

impl NormalizedFile {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Local::now(),
            kind,
        }
    }

    pub fn is_image(&self) -> bool {
        match &self.kind {
            FileKind::Image(_) => true,
            FileKind::Video(_) => false,
            FileKind::Other(other) => other.format.as_ref().is_some_and(FormatTag::is_image),
        }
    }

    pub fn as_image(&self) -> Option<&ImageFile> {
        match &self.kind {
            FileKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoFile> {
        match &self.kind {
            FileKind::Video(video) => Some(video),
            _ => None,
        }
    }

    /// 主数据：图片字节、视频原始字节或文档字节。
    pub fn data(&self) -> &Bytes {
        match &self.kind {
            FileKind::Image(image) => &image.data,
            FileKind::Video(video) => &video.data,
            FileKind::Other(other) => &other.data,
        }
    }

    pub fn format(&self) -> Option<&FormatTag> {
        match &self.kind {
            FileKind::Image(image) => Some(&image.format),
            FileKind::Video(video) => video.format.as_ref(),
            FileKind::Other(other) => other.format.as_ref(),
        }
    }

    /// 图片或视频预览的 data URL，便于直接交给 WebView 展示。
    pub fn preview_data_url(&self) -> Option<String> {
        let (format, data) = match &self.kind {
            FileKind::Image(image) => (&image.format, &image.data),
            FileKind::Video(video) => (&video.preview_format, &video.preview_data),
            FileKind::Other(_) => return None,
        };
        Some(format!(
            "data:{};base64,{}",
            format.mime_type,
            general_purpose::STANDARD.encode(data)
        ))
    }
}

/// 单项失败记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub item: String,
    pub error: MediaError,
}

impl ItemFailure {
    pub fn new(item: impl Into<String>, error: MediaError) -> Self {
        Self {
            item: item.into(),
            error,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.error.stage()
    }
}

/// 一次选择的最终结果；顺序为完成顺序，不保证与选择顺序一致。
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub files: Vec<NormalizedFile>,
    pub failures: Vec<ItemFailure>,
}

impl SelectionResult {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedFile> {
        self.files.iter()
    }

    pub fn into_files(self) -> Vec<NormalizedFile> {
        self.files
    }

    pub(crate) fn merge(&mut self, other: SelectionResult) {
        self.files.extend(other.files);
        self.failures.extend(other.failures);
    }
}

impl IntoIterator for SelectionResult {
    type Item = NormalizedFile;
    type IntoIter = std::vec::IntoIter<NormalizedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}
