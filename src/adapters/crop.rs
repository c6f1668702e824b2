//! 非交互式裁剪：按策略中的宽高比取居中的最大矩形。
//!
//! 命令行场景没有裁剪界面，以固定规则代替用户手势；
//! 自由比例（未给出默认比例）时原样返回。

use async_trait::async_trait;
use image::DynamicImage;

use crate::platform::{CropEditor, CropOutcome};
use crate::policy::{AspectRatio, AspectRatioPolicy, PixelSize};

#[derive(Debug, Clone, Copy, Default)]
pub struct CenterCropEditor;

/// 居中的最大裁剪矩形 `(x, y, width, height)`。
pub fn centered_crop_rect(size: PixelSize, ratio: AspectRatio) -> (u32, u32, u32, u32) {
    if size.is_empty() || ratio.width == 0 || ratio.height == 0 {
        return (0, 0, size.width, size.height);
    }

    let target = ratio.ratio();
    let current = size.width as f64 / size.height as f64;

    let (width, height) = if current > target {
        let width = (size.height as f64 * target).round() as u32;
        (width.clamp(1, size.width), size.height)
    } else {
        let height = (size.width as f64 / target).round() as u32;
        (size.width, height.clamp(1, size.height))
    };

    (
        (size.width - width) / 2,
        (size.height - height) / 2,
        width,
        height,
    )
}

#[async_trait]
impl CropEditor for CenterCropEditor {
    async fn crop(&self, image: DynamicImage, ratio_policy: &AspectRatioPolicy) -> CropOutcome {
        let Some(ratio) = ratio_policy.initial_ratio() else {
            return CropOutcome::Cropped(image);
        };

        let size = PixelSize::new(image.width(), image.height());
        let (x, y, width, height) = centered_crop_rect(size, ratio);
        log::debug!("✂️ 居中裁剪 {} -> {}x{}（比例 {}）", size, width, height, ratio);

        CropOutcome::Cropped(image.crop_imm(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_image_is_cropped_horizontally() {
        let rect = centered_crop_rect(PixelSize::new(400, 300), AspectRatio::SQUARE);
        assert_eq!(rect, (50, 0, 300, 300));
    }

    #[test]
    fn tall_image_is_cropped_vertically() {
        let rect = centered_crop_rect(PixelSize::new(300, 600), AspectRatio::new(3, 4));
        assert_eq!(rect, (0, 100, 300, 400));
    }

    #[test]
    fn matching_ratio_keeps_full_frame() {
        let rect = centered_crop_rect(PixelSize::new(1600, 900), AspectRatio::new(16, 9));
        assert_eq!(rect, (0, 0, 1600, 900));
    }

    #[tokio::test]
    async fn free_ratio_returns_image_unchanged() {
        let image = DynamicImage::new_rgb8(40, 20);
        let policy = AspectRatioPolicy::Selectable { default: None };

        match CenterCropEditor.crop(image, &policy).await {
            CropOutcome::Cropped(out) => assert_eq!((out.width(), out.height()), (40, 20)),
            CropOutcome::Cancelled => panic!("center crop never cancels"),
        }
    }

    #[tokio::test]
    async fn fixed_ratio_crops_image() {
        let image = DynamicImage::new_rgb8(40, 20);
        let policy = AspectRatioPolicy::Fixed(AspectRatio::SQUARE);

        match CenterCropEditor.crop(image, &policy).await {
            CropOutcome::Cropped(out) => assert_eq!((out.width(), out.height()), (20, 20)),
            CropOutcome::Cancelled => panic!("center crop never cancels"),
        }
    }
}
