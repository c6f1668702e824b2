//! # 平台协作方接口
//!
//! ## 设计思路
//!
//! 选择器界面、素材提供方、视频资源解析、交互式裁剪都属于外部协作方。
//! 编排层只依赖这里定义的抽象接口，各宿主环境提供自己的适配器
//! （本仓库自带的文件系统 / ffmpeg / 自动裁剪适配器见 `adapters`）。
//!
//! ## 实现思路
//!
//! - 所有异步接口通过 `async_trait` 保持对象安全，便于以 `Arc<dyn _>` 注入。
//! - 选择器返回 `SurfaceOutcome`，取消是正常分支而不是错误。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;

use crate::media::MediaError;
use crate::policy::{AspectRatioPolicy, PixelSize, SourceKind};

/// 素材提供方可交付的表示类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Movie,
    Data,
}

/// 素材的具体表示：内存字节或（仅在调用期间有效的）文件路径。
#[derive(Debug, Clone)]
pub enum Representation {
    Bytes(Bytes),
    File(PathBuf),
}

/// 单个被选中条目的提供方。
#[async_trait]
pub trait ItemProvider: Send + Sync {
    /// 用于日志与失败记录的标识。
    fn label(&self) -> String;

    /// 是否能以指定类型交付。
    fn conforms_to(&self, kind: AssetKind) -> bool;

    /// 按类型加载表示，每个条目独立执行。
    async fn load_representation(&self, kind: AssetKind) -> Result<Representation, MediaError>;
}

pub type PickedItem = Arc<dyn ItemProvider>;

/// 展示选择器时的请求参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub source: SourceKind,
    pub selection_limit: u32,
    pub accepted_kinds: Vec<AssetKind>,
    /// 该请求是否为裁剪取消后的重新展示。
    pub is_retry: bool,
}

pub enum SurfaceOutcome {
    /// 相册 / 多媒体 / 文档选择结果。
    Picked(Vec<PickedItem>),
    /// 相机直接交付的图像。
    Captured(DynamicImage),
    Cancelled,
}

/// 平台选择器界面。
#[async_trait]
pub trait PickerSurface: Send + Sync {
    async fn present(&self, request: &SurfaceRequest) -> SurfaceOutcome;

    async fn dismiss(&self) {}
}

/// 视频轨道的仿射变换（只关心线性部分）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn from_rotation_degrees(degrees: f64) -> Self {
        let radians = degrees.to_radians();
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// 对尺寸应用变换并取绝对值（平移不影响尺寸）。
    pub fn apply_to_size(&self, width: f64, height: f64) -> (f64, f64) {
        let w = self.a * width + self.c * height;
        let h = self.b * width + self.d * height;
        (w.abs(), h.abs())
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoTrackInfo {
    pub natural_width: f64,
    pub natural_height: f64,
    pub transform: AffineTransform,
}

impl VideoTrackInfo {
    /// 经过轨道变换后的显示分辨率。
    pub fn display_size(&self) -> Option<PixelSize> {
        let (w, h) = self
            .transform
            .apply_to_size(self.natural_width, self.natural_height);
        let size = PixelSize::new(w.round() as u32, h.round() as u32);
        (!size.is_empty()).then_some(size)
    }
}

/// 视频资源解析能力。
#[async_trait]
pub trait VideoInspector: Send + Sync {
    /// 第一条视频轨道的信息；没有视频轨道时返回 `None`。
    async fn track_info(&self, path: &Path) -> Result<Option<VideoTrackInfo>, MediaError>;

    /// 提取指定时间点的帧，需已应用轨道变换。
    async fn frame_at(&self, path: &Path, time: Duration) -> Result<DynamicImage, MediaError>;
}

pub enum CropOutcome {
    Cropped(DynamicImage),
    Cancelled,
}

/// 交互式裁剪步骤。
#[async_trait]
pub trait CropEditor: Send + Sync {
    async fn crop(&self, image: DynamicImage, ratio_policy: &AspectRatioPolicy) -> CropOutcome;
}
