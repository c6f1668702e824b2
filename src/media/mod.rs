//! # 素材处理模块（media）
//!
//! ## 设计思路
//!
//! 将“条目加载 → 安全降采样 → 图片/视频归一化 → 暂存管理”按职责拆分为多个子模块，
//! 编排层（`pipeline`）只依赖这里暴露的少量类型。
//!
//! - `loader`：负责条目加载、类型选择与早期校验
//! - `image_normalizer`：负责按压缩策略缩放并编码 JPEG
//! - `video_normalizer`：负责预览帧、分辨率解析与视频字节读取
//! - `document`：文档条目直接打包
//! - `resize`：尺寸计算（纯函数）与像素缩放
//! - `staging`：视频暂存文件的生命周期
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! SelectionPipeline::run
//!    ↓
//! loader.rs（并发加载 + 校验 + 降采样 / 暂存）
//!    ↓
//! image_normalizer.rs / video_normalizer.rs / document.rs
//!    ↓
//! NormalizedFile（model.rs）
//! ```
//!
//! ## 分层职责建议
//!
//! - 配置与性能档位变更优先改 `config.rs`
//! - 尺寸策略变更优先改 `resize.rs`，并同步更新属性测试
//! - 单阶段行为优化分别改 `loader / image_normalizer / video_normalizer`

mod config;
mod document;
mod error;
mod image_normalizer;
mod loader;
mod resize;
mod source;
mod staging;
mod video_normalizer;

pub use config::{MediaAdvancedConfig, MediaConfig, PerformanceProfile};
pub use document::normalize_document;
pub use error::MediaError;
pub use image_normalizer::{EncodedImage, ImageNormalizer};
pub use loader::AssetLoader;
pub use resize::{clamp_longest_edge, fit_size};
pub use source::{LoadedAsset, RawAsset};
pub use staging::{StagedFile, StagingArea};
pub use video_normalizer::VideoNormalizer;
