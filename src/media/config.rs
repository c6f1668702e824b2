//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `MediaConfig`，与调用方每次传入的 `SelectionPolicy` 区分：
//! 策略描述“这一次要什么”，配置描述“这台设备怎么处理”。
//! 性能档位（quality / balanced / speed）作为高层语义，映射到底层参数组合。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - `PerformanceProfile` 负责档位字符串解析与反向输出。
//! - `MediaAdvancedConfig` 可从 JSON 文件读取，校验通过后覆盖到 `MediaConfig`。

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use super::MediaError;

/// 素材处理配置。
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// 加载阶段的安全降采样上限（最长边像素）。
    pub load_max_pixel_size: u32,
    /// 解码前按文件头拒绝的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 同时执行的单项任务上限（加载 / 归一化共用）。
    pub max_concurrency: usize,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
    /// 是否允许把小图放大到目标框。
    pub allow_upscale: bool,
    /// 视频整体读入内存前的体积上限（字节）。
    pub max_video_bytes: u64,
    /// 文档整体读入内存前的体积上限（字节）。
    pub max_document_bytes: u64,
    /// 视频暂存目录，`None` 时使用系统临时目录。
    pub staging_dir: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            load_max_pixel_size: 2_000,
            max_decoded_pixels: 100_000_000,
            max_concurrency: 4,
            resize_filter: FilterType::Triangle,
            allow_upscale: false,
            max_video_bytes: 512 * 1024 * 1024,
            max_document_bytes: 100 * 1024 * 1024,
            staging_dir: None,
        }
    }
}

/// 性能档位（面向产品/用户语义）。
///
/// - `Quality`：尽量保真
/// - `Balanced`：质量与性能平衡
/// - `Speed`：优先处理速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceProfile {
    Quality,
    Balanced,
    Speed,
}

impl PerformanceProfile {
    /// 从外部字符串解析档位。
    ///
    /// # 示例
    /// ```rust
    /// use files_picker::media::PerformanceProfile;
    ///
    /// let p = PerformanceProfile::from_str("balanced")?;
    /// assert_eq!(p.as_str(), "balanced");
    /// # Ok::<(), files_picker::media::MediaError>(())
    /// ```
    pub fn from_str(profile: &str) -> Result<Self, MediaError> {
        match profile.trim().to_lowercase().as_str() {
            "quality" => Ok(Self::Quality),
            "balanced" => Ok(Self::Balanced),
            "speed" => Ok(Self::Speed),
            other => Err(MediaError::InvalidConfig(format!(
                "未知性能档位：{}（可选：quality / balanced / speed）",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Balanced => "balanced",
            Self::Speed => "speed",
        }
    }
}

impl MediaConfig {
    /// 基于当前参数反推性能档位。
    pub fn infer_performance_profile(&self) -> PerformanceProfile {
        if self.load_max_pixel_size >= 4_000 && self.resize_filter == FilterType::Lanczos3 {
            return PerformanceProfile::Quality;
        }

        if self.load_max_pixel_size <= 1_600 || self.resize_filter == FilterType::Nearest {
            return PerformanceProfile::Speed;
        }

        PerformanceProfile::Balanced
    }

    /// 应用指定性能档位到实际参数。
    pub fn apply_performance_profile(&mut self, profile: PerformanceProfile) {
        match profile {
            PerformanceProfile::Quality => {
                self.load_max_pixel_size = 4_096;
                self.resize_filter = FilterType::Lanczos3;
                self.max_concurrency = 2;
            }
            PerformanceProfile::Balanced => {
                self.load_max_pixel_size = 2_000;
                self.resize_filter = FilterType::Triangle;
                self.max_concurrency = 4;
            }
            PerformanceProfile::Speed => {
                self.load_max_pixel_size = 1_280;
                self.resize_filter = FilterType::Nearest;
                self.max_concurrency = 8;
            }
        }
    }

    /// 校验后应用高级配置。
    pub fn apply_advanced(&mut self, advanced: &MediaAdvancedConfig) -> Result<(), MediaError> {
        advanced.validate()?;

        if let Some(profile) = &advanced.profile {
            self.apply_performance_profile(PerformanceProfile::from_str(profile)?);
        }
        if let Some(value) = advanced.load_max_pixel_size {
            self.load_max_pixel_size = value;
        }
        if let Some(value) = advanced.max_concurrency {
            self.max_concurrency = value;
        }
        if let Some(value) = advanced.allow_upscale {
            self.allow_upscale = value;
        }
        if let Some(value) = advanced.max_video_mb {
            self.max_video_bytes = value * 1024 * 1024;
        }
        if let Some(value) = advanced.max_document_mb {
            self.max_document_bytes = value * 1024 * 1024;
        }
        if let Some(dir) = &advanced.staging_dir {
            self.staging_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }
}

/// 可持久化的高级配置，所有字段均可缺省。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAdvancedConfig {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub load_max_pixel_size: Option<u32>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub allow_upscale: Option<bool>,
    #[serde(default)]
    pub max_video_mb: Option<u64>,
    #[serde(default)]
    pub max_document_mb: Option<u64>,
    #[serde(default)]
    pub staging_dir: Option<String>,
}

impl MediaAdvancedConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, MediaError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MediaError::InvalidConfig(format!("读取配置文件失败：{}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| MediaError::InvalidConfig(format!("解析配置文件失败：{}", e)))
    }

    pub fn validate(&self) -> Result<(), MediaError> {
        if let Some(value) = self.load_max_pixel_size {
            if !(256..=16_384).contains(&value) {
                return Err(MediaError::InvalidConfig(
                    "load_max_pixel_size 必须在 256~16384 之间".to_string(),
                ));
            }
        }
        if let Some(value) = self.max_concurrency {
            if !(1..=64).contains(&value) {
                return Err(MediaError::InvalidConfig(
                    "max_concurrency 必须在 1~64 之间".to_string(),
                ));
            }
        }
        if let Some(value) = self.max_video_mb {
            if !(1..=8_192).contains(&value) {
                return Err(MediaError::InvalidConfig(
                    "max_video_mb 必须在 1~8192 之间".to_string(),
                ));
            }
        }
        if let Some(value) = self.max_document_mb {
            if !(1..=4_096).contains(&value) {
                return Err(MediaError::InvalidConfig(
                    "max_document_mb 必须在 1~4096 之间".to_string(),
                ));
            }
        }
        if let Some(dir) = &self.staging_dir {
            if dir.trim().is_empty() {
                return Err(MediaError::InvalidConfig("staging_dir 不能为空字符串".to_string()));
            }
        }
        Ok(())
    }
}
