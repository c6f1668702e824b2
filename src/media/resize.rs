//! # 缩放与尺寸计算模块
//!
//! ## 设计思路
//!
//! 尺寸计算是纯函数，与像素处理分离，便于单测与属性测试。
//! 像素缩放优先使用 `fast_image_resize`，失败时回退到 `image::resize_exact`。
//!
//! ## 实现思路
//!
//! 1. 按源图方向选择横向或纵向目标框
//! 2. 等比适配进目标框（默认不放大）
//! 3. 转 RGBA 后交给 `fast_image_resize` 卷积缩放

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};

use super::MediaError;
use crate::policy::PixelSize;

/// 计算源图适配进 `max_size` 后的尺寸。
///
/// 横向源图使用横向框，其余（纵向、正方形）使用旋转 90° 后的框。
///
/// # 示例
/// ```rust
/// use files_picker::media::fit_size;
/// use files_picker::policy::PixelSize;
///
/// let out = fit_size(PixelSize::new(4000, 3000), PixelSize::new(1920, 1080), false);
/// assert_eq!(out, PixelSize::new(1440, 1080));
///
/// let portrait = fit_size(PixelSize::new(3000, 4000), PixelSize::new(1920, 1080), false);
/// assert_eq!(portrait, PixelSize::new(1080, 1440));
/// ```
pub fn fit_size(source: PixelSize, max_size: PixelSize, allow_upscale: bool) -> PixelSize {
    if source.is_empty() || max_size.is_empty() {
        return source;
    }

    let bounds = if source.is_landscape() {
        landscape_box(max_size)
    } else {
        landscape_box(max_size).rotated()
    };

    let scale = (bounds.width as f64 / source.width as f64)
        .min(bounds.height as f64 / source.height as f64);
    let scale = if allow_upscale { scale } else { scale.min(1.0) };

    if (scale - 1.0).abs() < f64::EPSILON {
        return source;
    }

    let width = ((source.width as f64 * scale).round() as u32).clamp(1, bounds.width.max(1));
    let height = ((source.height as f64 * scale).round() as u32).clamp(1, bounds.height.max(1));
    PixelSize::new(width, height)
}

/// 最长边缩放到 `max_edge` 以内所需的尺寸；无需缩放时返回 `None`。
pub fn clamp_longest_edge(source: PixelSize, max_edge: u32) -> Option<PixelSize> {
    let longest = source.longest_edge();
    if max_edge == 0 || longest <= max_edge {
        return None;
    }

    let scale = max_edge as f64 / longest as f64;
    Some(PixelSize::new(
        ((source.width as f64 * scale).round() as u32).max(1),
        ((source.height as f64 * scale).round() as u32).max(1),
    ))
}

/// 调用方给出的框按横向解释（宽 ≥ 高）。
fn landscape_box(size: PixelSize) -> PixelSize {
    if size.width >= size.height {
        size
    } else {
        size.rotated()
    }
}

/// 缩放到精确尺寸；尺寸相同时原样返回。
pub(crate) fn resize_image(
    image: DynamicImage,
    target: PixelSize,
    filter: FilterType,
) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width == target.width && height == target.height {
        return image;
    }

    match resize_with_fast_image_resize(&image, target.width, target.height, filter) {
        Ok(resized) => resized,
        Err(err) => {
            log::warn!(
                "⚠️ fast_image_resize 缩放失败，回退 image::resize_exact：{}",
                err
            );
            image.resize_exact(target.width, target.height, filter)
        }
    }
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<DynamicImage, MediaError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| MediaError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| MediaError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba =
        ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
            .ok_or_else(|| MediaError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}
