//! # 图片归一化模块
//!
//! ## 设计思路
//!
//! 输入是已解码的图像和压缩策略，输出统一为 JPEG 字节 + 尺寸 + 图像句柄。
//! 编码失败（例如不支持的像素格式）只丢弃该项，不影响整批。
//!
//! ## 实现思路
//!
//! - `Original`：尺寸不变，以质量 100 重新编码。
//! - `Compressed`：按方向自适应目标框计算尺寸 → 缩放 → 按质量编码。
//! - 缩放与编码都是 CPU 密集操作，异步入口放到 `spawn_blocking` 中执行。

use std::sync::Arc;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::resize::{fit_size, resize_image};
use super::{MediaConfig, MediaError};
use crate::model::{FileKind, FormatTag, ImageFile, NormalizedFile};
use crate::policy::{Compression, PixelSize, Quality};

pub(crate) const IMAGE_FILE_NAME: &str = "image";

/// 编码后的图片。
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Bytes,
    pub image: DynamicImage,
    pub size: PixelSize,
}

#[derive(Debug, Clone)]
pub struct ImageNormalizer {
    filter: FilterType,
    allow_upscale: bool,
}

impl ImageNormalizer {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            filter: config.resize_filter,
            allow_upscale: config.allow_upscale,
        }
    }

    /// 按压缩策略缩放并编码（同步）。
    pub fn encode(
        &self,
        image: DynamicImage,
        compression: Compression,
    ) -> Result<EncodedImage, MediaError> {
        let (width, height) = image.dimensions();
        let source = PixelSize::new(width, height);

        let (image, quality) = match compression {
            Compression::Original => (image, Quality::Original),
            Compression::Compressed { max_size, quality } => {
                let target = fit_size(source, max_size, self.allow_upscale);
                if target != source {
                    log::debug!("🧩 图片缩放：{} -> {}（filter={:?}）", source, target, self.filter);
                }
                (resize_image(image, target, self.filter), quality)
            }
        };

        let (width, height) = image.dimensions();
        let data = encode_jpeg(&image, quality.jpeg_quality())?;

        Ok(EncodedImage {
            data,
            image,
            size: PixelSize::new(width, height),
        })
    }

    /// 归一化为 `Image` 类型的结果文件。
    pub async fn normalize(
        &self,
        image: DynamicImage,
        compression: Compression,
    ) -> Result<NormalizedFile, MediaError> {
        let normalizer = self.clone();
        let encoded =
            tokio::task::spawn_blocking(move || normalizer.encode(image, compression)).await??;

        Ok(NormalizedFile::new(
            IMAGE_FILE_NAME,
            FileKind::Image(ImageFile {
                data: encoded.data,
                image: Arc::new(encoded.image),
                size: encoded.size,
                format: FormatTag::jpeg(),
            }),
        ))
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Bytes, MediaError> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();

    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(|e| MediaError::Encode(format!("JPEG 编码失败：{}", e)))?;

    if buffer.is_empty() {
        return Err(MediaError::Encode("JPEG 编码结果为空".to_string()));
    }

    Ok(Bytes::from(buffer))
}
