//! # 中间数据模型
//!
//! ## 设计思路
//!
//! 将“平台交付的原始素材”和“归一化结果”解耦：
//! - `RawAsset` 表示已加载但未归一化的素材，归一化后即丢弃
//! - `LoadedAsset` 额外携带条目标识，用于日志与失败记录

use image::DynamicImage;

use super::StagedFile;

/// 加载阶段输出的原始素材。
#[derive(Debug)]
pub enum RawAsset {
    /// 已解码并经过安全降采样的图像。
    Image(DynamicImage),
    /// 已暂存到私有目录的视频文件。
    Video(StagedFile),
    /// 文档原始字节及其扩展名。
    Document {
        bytes: bytes::Bytes,
        name: String,
        extension: Option<String>,
    },
}

impl RawAsset {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Video(_) => "video",
            Self::Document { .. } => "document",
        }
    }
}

#[derive(Debug)]
pub struct LoadedAsset {
    pub item: String,
    pub asset: RawAsset,
}
