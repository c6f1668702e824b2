//! # 选择策略模块
//!
//! ## 设计思路
//!
//! 调用方在每次唤起选择器时提供一份不可变的 `SelectionPolicy`，
//! 它决定来源类型、可选数量、是否进入裁剪步骤以及压缩方式。
//!
//! 来源使用封闭的 `PickerSource` 枚举表达，每个分支携带自己的配置，
//! 新增来源时编译器会强制所有 `match` 补齐分支。
//!
//! ## 实现思路
//!
//! - `PickerSource` → `SelectionPolicy` 的转换同时完成校验。
//! - 非法组合（裁剪 + 多选、裁剪 + 视频等）在展示任何界面前返回 `PolicyError`。
//! - 文档来源永远不做裁剪/压缩，直接固定为 `NotAllowed` + `Original`。

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// 像素尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_landscape(self) -> bool {
        self.width > self.height
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// 宽高互换（横向框 ↔ 纵向框）。
    pub fn rotated(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub fn longest_edge(self) -> u32 {
        self.width.max(self.height)
    }
}

impl fmt::Display for PixelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for PixelSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// 压缩质量档位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
    Original,
}

impl Quality {
    /// 0.0 ~ 1.0 的压缩系数。
    pub fn value(self) -> f32 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.5,
            Self::High => 0.75,
            Self::Original => 1.0,
        }
    }

    /// 映射到 JPEG 编码器使用的 1~100 质量值。
    pub fn jpeg_quality(self) -> u8 {
        ((self.value() * 100.0).round() as u8).clamp(1, 100)
    }
}

impl std::str::FromStr for Quality {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "original" => Ok(Self::Original),
            other => Err(PolicyError::UnknownQuality(other.to_string())),
        }
    }
}

/// 图片压缩策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    /// 保持原尺寸，以最高质量重新编码。
    Original,
    /// 缩放进 `max_size`（方向自适应）后按 `quality` 编码。
    Compressed { max_size: PixelSize, quality: Quality },
}

impl Compression {
    pub const DEFAULT_MAX_SIZE: PixelSize = PixelSize::new(1920, 1080);

    pub fn compressed() -> Self {
        Self::Compressed {
            max_size: Self::DEFAULT_MAX_SIZE,
            quality: Quality::Medium,
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::compressed()
    }
}

/// 裁剪宽高比，例如 `1:1`、`16:9`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio { width: 1, height: 1 };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// 解析 `W:H` 形式的字符串。
    pub fn parse(value: &str) -> Result<Self, PolicyError> {
        let (w, h) = value
            .split_once(':')
            .ok_or_else(|| PolicyError::InvalidAspectRatio(value.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| PolicyError::InvalidAspectRatio(value.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| PolicyError::InvalidAspectRatio(value.to_string()))?;

        Ok(Self { width, height })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// 裁剪步骤可用的宽高比策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatioPolicy {
    /// 只允许一个固定比例。
    Fixed(AspectRatio),
    /// 用户可在多个比例中切换；`default` 为初始比例，`None` 表示自由比例。
    Selectable { default: Option<AspectRatio> },
}

impl AspectRatioPolicy {
    /// 进入裁剪界面时默认使用的比例。
    pub fn initial_ratio(&self) -> Option<AspectRatio> {
        match self {
            Self::Fixed(ratio) => Some(*ratio),
            Self::Selectable { default } => *default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropMode {
    NotAllowed,
    Allowed(AspectRatioPolicy),
}

impl CropMode {
    pub fn is_crop_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// 来源类型（无负载），用于日志、请求与分支判断。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Camera,
    PhotoLibrary,
    DocumentBrowser,
    /// 照片 + 视频。
    Multimedia,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::PhotoLibrary => "photos",
            Self::DocumentBrowser => "files",
            Self::Multimedia => "multimedia",
        }
    }
}

/// 调用方唤起选择器时使用的来源描述，每个分支携带各自配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerSource {
    /// 拍照，可裁剪/压缩。
    Camera {
        crop_mode: CropMode,
        compression: Compression,
    },
    /// 仅照片；`selection_limit > 1` 时不允许裁剪。
    Photos {
        selection_limit: u32,
        crop_mode: CropMode,
        compression: Compression,
    },
    /// 文档浏览器。
    Files { allow_multiple_selection: bool },
    /// 照片 + 视频，压缩同时作用于图片和视频预览帧。
    Multimedia {
        selection_limit: u32,
        image_compression: Compression,
    },
}

impl PickerSource {
    pub fn id(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Camera { .. } => SourceKind::Camera,
            Self::Photos { .. } => SourceKind::PhotoLibrary,
            Self::Files { .. } => SourceKind::DocumentBrowser,
            Self::Multimedia { .. } => SourceKind::Multimedia,
        }
    }
}

/// 策略校验错误（调用方契约错误）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("可选数量必须大于 0")]
    ZeroSelectionLimit,

    #[error("拍照来源的可选数量只能为 1（当前：{0}）")]
    CameraSelectionLimit(u32),

    #[error("可选数量为 {0} 时不允许裁剪")]
    CropWithMultipleSelection(u32),

    #[error("来源 {0:?} 不支持裁剪")]
    CropUnsupportedSource(SourceKind),

    #[error("文档来源不支持压缩")]
    CompressionUnsupportedSource,

    #[error("压缩尺寸不能为 0（当前：{0}）")]
    EmptyMaxSize(PixelSize),

    #[error("无效宽高比：{0}")]
    InvalidAspectRatio(String),

    #[error("未知压缩质量：{0}（可选：low / medium / high / original）")]
    UnknownQuality(String),
}

/// 单次唤起内不可变的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPolicy {
    source: SourceKind,
    selection_limit: NonZeroU32,
    crop_mode: CropMode,
    compression: Compression,
}

impl SelectionPolicy {
    /// 构建并校验策略。
    ///
    /// # 示例
    /// ```rust
    /// use files_picker::policy::{Compression, CropMode, SelectionPolicy, SourceKind};
    ///
    /// let policy = SelectionPolicy::new(
    ///     SourceKind::PhotoLibrary,
    ///     3,
    ///     CropMode::NotAllowed,
    ///     Compression::compressed(),
    /// )?;
    /// assert_eq!(policy.selection_limit(), 3);
    /// # Ok::<(), files_picker::policy::PolicyError>(())
    /// ```
    pub fn new(
        source: SourceKind,
        selection_limit: u32,
        crop_mode: CropMode,
        compression: Compression,
    ) -> Result<Self, PolicyError> {
        let limit = NonZeroU32::new(selection_limit).ok_or(PolicyError::ZeroSelectionLimit)?;

        if source == SourceKind::Camera && limit.get() != 1 {
            return Err(PolicyError::CameraSelectionLimit(limit.get()));
        }

        if let CropMode::Allowed(ratio_policy) = crop_mode {
            match source {
                SourceKind::Camera | SourceKind::PhotoLibrary => {}
                SourceKind::DocumentBrowser | SourceKind::Multimedia => {
                    return Err(PolicyError::CropUnsupportedSource(source));
                }
            }
            if limit.get() > 1 {
                return Err(PolicyError::CropWithMultipleSelection(limit.get()));
            }
            validate_ratio_policy(&ratio_policy)?;
        }

        if let Compression::Compressed { max_size, .. } = compression {
            if source == SourceKind::DocumentBrowser {
                return Err(PolicyError::CompressionUnsupportedSource);
            }
            if max_size.is_empty() {
                return Err(PolicyError::EmptyMaxSize(max_size));
            }
        }

        Ok(Self {
            source,
            selection_limit: limit,
            crop_mode,
            compression,
        })
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    pub fn selection_limit(&self) -> u32 {
        self.selection_limit.get()
    }

    pub fn crop_mode(&self) -> &CropMode {
        &self.crop_mode
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }
}

fn validate_ratio_policy(policy: &AspectRatioPolicy) -> Result<(), PolicyError> {
    if let Some(ratio) = policy.initial_ratio() {
        if ratio.width == 0 || ratio.height == 0 {
            return Err(PolicyError::InvalidAspectRatio(ratio.to_string()));
        }
    }
    Ok(())
}

impl TryFrom<PickerSource> for SelectionPolicy {
    type Error = PolicyError;

    fn try_from(source: PickerSource) -> Result<Self, Self::Error> {
        match source {
            PickerSource::Camera {
                crop_mode,
                compression,
            } => Self::new(SourceKind::Camera, 1, crop_mode, compression),
            PickerSource::Photos {
                selection_limit,
                crop_mode,
                compression,
            } => Self::new(SourceKind::PhotoLibrary, selection_limit, crop_mode, compression),
            PickerSource::Files {
                allow_multiple_selection,
            } => {
                let limit = if allow_multiple_selection {
                    NonZeroU32::MAX.get()
                } else {
                    1
                };
                Self::new(
                    SourceKind::DocumentBrowser,
                    limit,
                    CropMode::NotAllowed,
                    Compression::Original,
                )
            }
            PickerSource::Multimedia {
                selection_limit,
                image_compression,
            } => Self::new(
                SourceKind::Multimedia,
                selection_limit,
                CropMode::NotAllowed,
                image_compression,
            ),
        }
    }
}
