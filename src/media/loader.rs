//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 将平台交付的条目物化为 `RawAsset`，并在“尽可能早”的阶段执行输入校验，
//! 目标是尽快失败，减少不必要的内存与 CPU 消耗。
//! 每个条目独立加载：单项失败只记录并丢弃，不影响同批其他条目。
//!
//! ## 实现思路
//!
//! - 一个条目一个任务（`JoinSet`），由共享 `Semaphore` 限制并发。
//! - 图片：文件头尺寸 + 像素上限校验 → 解码并应用 EXIF 方向 → 最长边安全降采样。
//! - 视频：复制 / 写入到私有暂存目录，保证文件在选择器会话结束后仍可用。
//! - 文档：metadata 体积校验后整体读入。
//! - 结果按完成顺序收集，不恢复输入顺序。

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use image::{DynamicImage, ImageDecoder, ImageReader};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::resize::{clamp_longest_edge, resize_image};
use super::source::{LoadedAsset, RawAsset};
use super::{MediaConfig, MediaError, StagingArea};
use crate::model::ItemFailure;
use crate::platform::{AssetKind, PickedItem, Representation};
use crate::policy::PixelSize;

/// 条目加载器。
///
/// 持有单次运行的配置快照与并发许可，可廉价克隆到各个任务中。
#[derive(Clone)]
pub struct AssetLoader {
    config: Arc<MediaConfig>,
    staging: StagingArea,
    permits: Arc<Semaphore>,
}

impl AssetLoader {
    pub fn new(config: MediaConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        let staging = StagingArea::new(config.staging_dir.clone());
        Self {
            config: Arc::new(config),
            staging,
            permits,
        }
    }

    /// 并发许可；归一化阶段复用同一个信号量，整次运行的并发上限一致。
    pub fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    /// 并发加载所有条目。
    ///
    /// 返回值中成功与失败的数量之和恒等于输入条目数。
    pub async fn load_all(
        &self,
        items: Vec<PickedItem>,
        accepted: &[AssetKind],
    ) -> (Vec<LoadedAsset>, Vec<ItemFailure>) {
        let start = Instant::now();
        let total = items.len();
        let accepted: Arc<[AssetKind]> = Arc::from(accepted);

        let mut tasks = JoinSet::new();
        for item in items {
            let loader = self.clone();
            let accepted = Arc::clone(&accepted);
            tasks.spawn(async move {
                let label = item.label();
                let result = loader.load_one(&item, &accepted).await;
                (label, result)
            });
        }

        let mut loaded = Vec::with_capacity(total);
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((label, Ok(asset))) => {
                    log::debug!("📦 条目加载完成 - {}（{}）", label, asset.kind_label());
                    loaded.push(LoadedAsset { item: label, asset });
                }
                Ok((label, Err(err))) => {
                    log::warn!("⚠️ 条目加载失败，已跳过 - {}：{}", label, err);
                    failures.push(ItemFailure::new(label, err));
                }
                Err(err) => {
                    log::warn!("⚠️ 条目加载任务异常退出：{}", err);
                    failures.push(ItemFailure::new("<unknown>", MediaError::from(err)));
                }
            }
        }

        log::info!(
            "📥 加载阶段完成 - 成功 {}/{}，耗时 {}ms",
            loaded.len(),
            total,
            start.elapsed().as_millis()
        );

        (loaded, failures)
    }

    async fn load_one(
        &self,
        item: &PickedItem,
        accepted: &[AssetKind],
    ) -> Result<RawAsset, MediaError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| MediaError::Load("并发许可已关闭".to_string()))?;

        let kind = select_kind(item, accepted).ok_or_else(|| {
            MediaError::UnsupportedType(format!("条目不符合请求的类型：{:?}", accepted))
        })?;
        let representation = item.load_representation(kind).await?;

        match kind {
            AssetKind::Image => self.load_image(representation).await,
            AssetKind::Movie => self.load_video(representation).await,
            AssetKind::Data => self.load_document(representation, item.label()).await,
        }
    }

    async fn load_image(&self, representation: Representation) -> Result<RawAsset, MediaError> {
        let bytes = match representation {
            Representation::Bytes(bytes) => bytes,
            Representation::File(path) => read_limited(&path, u64::MAX).await?,
        };

        let config = Arc::clone(&self.config);
        let image = tokio::task::spawn_blocking(move || decode_downsampled(&bytes, &config)).await??;
        Ok(RawAsset::Image(image))
    }

    async fn load_video(&self, representation: Representation) -> Result<RawAsset, MediaError> {
        let staged = match representation {
            Representation::File(path) => self.staging.stage_copy(&path).await?,
            Representation::Bytes(bytes) => {
                let extension = infer::get(&bytes).map(|kind| kind.extension());
                self.staging.stage_bytes(bytes, extension).await?
            }
        };
        log::debug!("🎞️ 视频已暂存：{}", staged.path().display());
        Ok(RawAsset::Video(staged))
    }

    async fn load_document(
        &self,
        representation: Representation,
        label: String,
    ) -> Result<RawAsset, MediaError> {
        let limit = self.config.max_document_bytes;
        match representation {
            Representation::File(path) => {
                let bytes = read_limited(&path, limit).await?;
                let name = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
                    .unwrap_or(label);
                let extension = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(str::to_lowercase);
                Ok(RawAsset::Document {
                    bytes,
                    name,
                    extension,
                })
            }
            Representation::Bytes(bytes) => {
                check_size(bytes.len() as u64, limit, "文档")?;
                Ok(RawAsset::Document {
                    bytes,
                    name: label,
                    extension: None,
                })
            }
        }
    }
}

/// 按请求类型的顺序选择条目可交付的第一个类型。
fn select_kind(item: &PickedItem, accepted: &[AssetKind]) -> Option<AssetKind> {
    accepted
        .iter()
        .copied()
        .find(|kind| *kind == AssetKind::Data || item.conforms_to(*kind))
}

async fn read_limited(path: &Path, limit: u64) -> Result<Bytes, MediaError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| MediaError::FileSystem(format!("无法读取文件信息：{}", e)))?;
    check_size(metadata.len(), limit, "文件")?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MediaError::FileSystem(format!("无法读取文件：{}", e)))?;
    Ok(Bytes::from(bytes))
}

fn check_size(len: u64, limit: u64, what: &str) -> Result<(), MediaError> {
    if len > limit {
        return Err(MediaError::ResourceLimit(format!(
            "{}过大：{:.2} MB（限制：{:.2} MB）",
            what,
            len as f64 / 1024.0 / 1024.0,
            limit as f64 / 1024.0 / 1024.0
        )));
    }
    Ok(())
}

/// 解码图片：先读文件头做像素校验，再完整解码并应用方向，最后安全降采样。
fn decode_downsampled(bytes: &[u8], config: &MediaConfig) -> Result<DynamicImage, MediaError> {
    let (header_width, header_height) = inspect_dimensions(bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::Decode(format!("无法识别图片格式：{}", e)))?;
    let mut decoder = reader
        .into_decoder()
        .map_err(|e| MediaError::Decode(format!("无法创建解码器：{}", e)))?;
    let orientation = decoder
        .orientation()
        .map_err(|e| MediaError::Decode(format!("无法读取图片方向：{}", e)))?;

    let mut image = DynamicImage::from_decoder(decoder)
        .map_err(|e| MediaError::Decode(format!("图片解码失败：{}", e)))?;
    image.apply_orientation(orientation);

    let source = PixelSize::new(image.width(), image.height());
    match clamp_longest_edge(source, config.load_max_pixel_size) {
        Some(target) => {
            log::debug!("🔧 加载阶段降采样：{} -> {}", source, target);
            Ok(resize_image(image, target, config.resize_filter))
        }
        None => Ok(image),
    }
}

/// 仅通过文件头读取宽高，用于完整解码前的像素限制检查。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), MediaError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::Decode(format!("无法识别图片格式：{}", e)))?
        .into_dimensions()
        .map_err(|e| MediaError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &MediaConfig, width: u32, height: u32) -> Result<(), MediaError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| MediaError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(MediaError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}
