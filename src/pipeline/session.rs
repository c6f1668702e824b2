//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `SelectionPipeline` 只负责流程编排与配置管理，不直接与任何平台界面绑定。
//! 处理链路固定为：
//! 1. 读取配置快照
//! 2. 展示平台界面并等待结果（取消 → `on_cancel`）
//! 3. 校验平台结果是否符合请求
//! 4. 裁剪路径：加载单张图片 → 裁剪 → 归一化 → `on_select`
//! 5. 批处理路径：`on_start_processing` → 并发加载 → 并发归一化 → `on_end_processing` → `on_select`
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<MediaConfig>>` 支持运行时动态切档。
//! - 单次调用内使用“同一配置快照”，避免处理中途配置漂移。
//! - 每一步都经过 `PipelineState::transition` 受检迁移。
//! - 记录 `load/normalize/total` 阶段耗时，便于性能诊断。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::DynamicImage;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{PipelineState, SelectionHandler};
use crate::error::PickerError;
use crate::media::{
    AssetLoader, ImageNormalizer, LoadedAsset, MediaAdvancedConfig, MediaConfig, MediaError,
    PerformanceProfile, RawAsset, VideoNormalizer, normalize_document,
};
use crate::model::{ItemFailure, SelectionResult};
use crate::platform::{
    AssetKind, CropEditor, CropOutcome, PickedItem, PickerSurface, SurfaceOutcome, SurfaceRequest,
    VideoInspector,
};
use crate::policy::{Compression, CropMode, SelectionPolicy, SourceKind};

const CAPTURED_ITEM_LABEL: &str = "camera";

/// 选择流程编排器。
///
/// 封装了配置状态与平台协作方，可在多次选择之间复用。
pub struct SelectionPipeline {
    config: Arc<RwLock<MediaConfig>>,
    inspector: Arc<dyn VideoInspector>,
    crop_editor: Arc<dyn CropEditor>,
}

/// 平台界面交回的一批内容。
enum Batch {
    Items(Vec<PickedItem>),
    Captured(DynamicImage),
}

/// 单次调用内共享的处理组件。
struct RunContext {
    compression: Compression,
    accepted: Vec<AssetKind>,
    loader: AssetLoader,
    images: ImageNormalizer,
    videos: VideoNormalizer,
    permits: Arc<Semaphore>,
}

impl SelectionPipeline {
    /// 根据初始配置与平台协作方创建编排器。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use files_picker::adapters::{CenterCropEditor, FfmpegInspector};
    /// use files_picker::media::MediaConfig;
    /// use files_picker::pipeline::SelectionPipeline;
    ///
    /// let pipeline = SelectionPipeline::new(
    ///     MediaConfig::default(),
    ///     Arc::new(FfmpegInspector::default()),
    ///     Arc::new(CenterCropEditor),
    /// );
    /// ```
    pub fn new(
        config: MediaConfig,
        inspector: Arc<dyn VideoInspector>,
        crop_editor: Arc<dyn CropEditor>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            inspector,
            crop_editor,
        }
    }

    /// 获取配置快照。
    ///
    /// 作用：保证单次选择链路使用一致参数。
    pub fn config_snapshot(&self) -> Result<MediaConfig, PickerError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| PickerError::Config("配置读取锁已中毒".to_string()))
    }

    /// 设置性能档位，对之后开始的选择生效。
    pub fn set_performance_profile(&self, profile: PerformanceProfile) -> Result<(), PickerError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| PickerError::Config("配置写入锁已中毒".to_string()))?;
        config.apply_performance_profile(profile);

        log::info!(
            "⚙️ 已切换性能档位：{:?}（load_max={}, filter={:?}, concurrency={}）",
            profile,
            config.load_max_pixel_size,
            config.resize_filter,
            config.max_concurrency
        );

        Ok(())
    }

    /// 获取当前生效档位。
    pub fn get_performance_profile(&self) -> Result<PerformanceProfile, PickerError> {
        let config = self
            .config
            .read()
            .map_err(|_| PickerError::Config("配置读取锁已中毒".to_string()))?;
        Ok(config.infer_performance_profile())
    }

    /// 校验并应用高级配置；校验失败时当前配置保持不变。
    pub fn set_advanced_config(&self, advanced: &MediaAdvancedConfig) -> Result<(), PickerError> {
        let mut next = self.config_snapshot()?;
        next.apply_advanced(advanced)?;

        let mut config = self
            .config
            .write()
            .map_err(|_| PickerError::Config("配置写入锁已中毒".to_string()))?;
        *config = next;

        log::info!("⚙️ 已更新高级配置：{:?}", advanced);
        Ok(())
    }

    /// 执行一次完整的选择流程，返回终止状态（`Done` 或 `Cancelled`）。
    ///
    /// 平台界面违反请求约定时返回 `PickerError::SurfaceContract`，
    /// 此时界面已被关闭，且不会触发任何回调。
    pub async fn run(
        &self,
        policy: &SelectionPolicy,
        surface: &dyn PickerSurface,
        handler: &dyn SelectionHandler,
    ) -> Result<PipelineState, PickerError> {
        let config = self.config_snapshot()?;
        let ctx = RunContext::new(policy, config, Arc::clone(&self.inspector));
        let mut state = PipelineState::Idle;
        let mut is_retry = false;

        log::info!(
            "🚀 开始选择 - source={} limit={} crop={} compression={:?}",
            policy.source().as_str(),
            policy.selection_limit(),
            policy.crop_mode().is_crop_allowed(),
            policy.compression()
        );

        loop {
            state.transition(PipelineState::AwaitingPlatformResult)?;

            let request = SurfaceRequest {
                source: policy.source(),
                selection_limit: policy.selection_limit(),
                accepted_kinds: ctx.accepted.clone(),
                is_retry,
            };

            let batch = match surface.present(&request).await {
                SurfaceOutcome::Picked(items) if !items.is_empty() => Batch::Items(items),
                SurfaceOutcome::Captured(image) => Batch::Captured(image),
                SurfaceOutcome::Picked(_) | SurfaceOutcome::Cancelled => {
                    state.transition(PipelineState::Cancelled)?;
                    surface.dismiss().await;
                    log::info!("🚫 用户取消选择");
                    handler.on_cancel();
                    return Ok(state);
                }
            };

            if let Err(err) = check_surface_contract(policy, &request, &batch) {
                log::error!("❌ {}", err);
                surface.dismiss().await;
                return Err(err);
            }

            state.transition(PipelineState::BatchReceived)?;
            state.transition(PipelineState::Processing)?;

            let ratio_policy = match policy.crop_mode() {
                CropMode::Allowed(ratio_policy) => *ratio_policy,
                CropMode::NotAllowed => {
                    surface.dismiss().await;
                    handler.on_start_processing();
                    let result = self.process_batch(&ctx, batch).await;
                    handler.on_end_processing();
                    state.transition(PipelineState::Done)?;
                    handler.on_select(result);
                    return Ok(state);
                }
            };

            let image = match self.load_for_crop(&ctx, batch).await {
                Ok(image) => image,
                Err(failure) => {
                    surface.dismiss().await;
                    state.transition(PipelineState::Done)?;
                    handler.on_select(SelectionResult {
                        files: Vec::new(),
                        failures: vec![failure],
                    });
                    return Ok(state);
                }
            };

            state.transition(PipelineState::CropPending)?;
            let outcome = self.crop_editor.crop(image, &ratio_policy).await;
            state.transition(PipelineState::CropResolved)?;

            match outcome {
                CropOutcome::Cropped(cropped) => {
                    let result = self.normalize_cropped(&ctx, cropped).await;
                    surface.dismiss().await;
                    state.transition(PipelineState::Done)?;
                    handler.on_select(result);
                    return Ok(state);
                }
                CropOutcome::Cancelled => {
                    log::info!(
                        "↩️ 裁剪已取消，重新展示{}界面",
                        retry_surface_label(policy.source())
                    );
                    is_retry = true;
                }
            }
        }
    }

    /// 批处理路径：并发加载 → 并发归一化。
    async fn process_batch(&self, ctx: &RunContext, batch: Batch) -> SelectionResult {
        let total_start = Instant::now();

        let load_start = Instant::now();
        let (loaded, failures) = match batch {
            Batch::Items(items) => ctx.loader.load_all(items, &ctx.accepted).await,
            Batch::Captured(image) => (
                vec![LoadedAsset {
                    item: CAPTURED_ITEM_LABEL.to_string(),
                    asset: RawAsset::Image(image),
                }],
                Vec::new(),
            ),
        };
        let load_elapsed = load_start.elapsed();

        let normalize_start = Instant::now();
        let mut result = SelectionResult {
            files: Vec::new(),
            failures,
        };
        result.merge(ctx.normalize_all(loaded).await);
        let normalize_elapsed = normalize_start.elapsed();

        log::info!(
            "✅ 批处理完成 - files={} failures={} load={}ms normalize={}ms total={}ms",
            result.files.len(),
            result.failures.len(),
            load_elapsed.as_millis(),
            normalize_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        result
    }

    async fn load_for_crop(&self, ctx: &RunContext, batch: Batch) -> Result<DynamicImage, ItemFailure> {
        let items = match batch {
            Batch::Captured(image) => return Ok(image),
            Batch::Items(items) => items,
        };

        let (mut loaded, mut failures) = ctx.loader.load_all(items, &[AssetKind::Image]).await;
        match loaded.pop() {
            Some(LoadedAsset {
                asset: RawAsset::Image(image),
                ..
            }) => Ok(image),
            Some(other) => Err(ItemFailure::new(
                other.item,
                MediaError::UnsupportedType(format!("裁剪只支持图片：{}", other.asset.kind_label())),
            )),
            None => Err(failures.pop().unwrap_or_else(|| {
                ItemFailure::new("<unknown>", MediaError::Load("裁剪图片加载失败".to_string()))
            })),
        }
    }

    async fn normalize_cropped(&self, ctx: &RunContext, cropped: DynamicImage) -> SelectionResult {
        let start = Instant::now();
        let mut result = SelectionResult::default();

        match ctx.images.normalize(cropped, ctx.compression).await {
            Ok(file) => result.files.push(file),
            Err(err) => {
                log::warn!("⚠️ 裁剪结果归一化失败：{}", err);
                result.failures.push(ItemFailure::new("cropped", err));
            }
        }

        log::info!("✅ 裁剪结果处理完成 - total={}ms", start.elapsed().as_millis());
        result
    }
}

impl RunContext {
    fn new(policy: &SelectionPolicy, config: MediaConfig, inspector: Arc<dyn VideoInspector>) -> Self {
        let images = ImageNormalizer::new(&config);
        let videos = VideoNormalizer::new(&config, inspector);
        let loader = AssetLoader::new(config);
        Self {
            compression: policy.compression(),
            accepted: accepted_kinds(policy.source()),
            images,
            videos,
            permits: loader.permits(),
            loader,
        }
    }

    /// 每个素材一个任务，按完成顺序收集。
    async fn normalize_all(&self, loaded: Vec<LoadedAsset>) -> SelectionResult {
        let mut tasks = JoinSet::new();

        for LoadedAsset { item, asset } in loaded {
            let permits = Arc::clone(&self.permits);
            let images = self.images.clone();
            let videos = self.videos.clone();
            let compression = self.compression;

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let result = match asset {
                    RawAsset::Image(image) => images.normalize(image, compression).await,
                    RawAsset::Video(staged) => videos.normalize(staged, compression).await,
                    RawAsset::Document {
                        bytes,
                        name,
                        extension,
                    } => Ok(normalize_document(bytes, name, extension)),
                };
                (item, result)
            });
        }

        let mut result = SelectionResult::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(file))) => result.files.push(file),
                Ok((item, Err(err))) => {
                    log::warn!("⚠️ 条目归一化失败，已跳过 - {}：{}", item, err);
                    result.failures.push(ItemFailure::new(item, err));
                }
                Err(err) => {
                    log::warn!("⚠️ 归一化任务异常退出：{}", err);
                    result
                        .failures
                        .push(ItemFailure::new("<unknown>", MediaError::from(err)));
                }
            }
        }
        result
    }
}

/// 各来源向平台请求的表示类型（按优先级排列）。
pub fn accepted_kinds(source: SourceKind) -> Vec<AssetKind> {
    match source {
        SourceKind::Camera | SourceKind::PhotoLibrary => vec![AssetKind::Image],
        SourceKind::Multimedia => vec![AssetKind::Image, AssetKind::Movie],
        SourceKind::DocumentBrowser => vec![AssetKind::Data],
    }
}

/// 校验平台结果是否符合请求：数量不超过上限，类型在请求范围内，裁剪时只有一张图片。
fn check_surface_contract(
    policy: &SelectionPolicy,
    request: &SurfaceRequest,
    batch: &Batch,
) -> Result<(), PickerError> {
    let items = match batch {
        Batch::Captured(_) => return Ok(()),
        Batch::Items(items) => items,
    };

    if items.len() as u64 > request.selection_limit as u64 {
        return Err(PickerError::SurfaceContract(format!(
            "返回了 {} 个条目，超过上限 {}",
            items.len(),
            request.selection_limit
        )));
    }

    let accepts_any = request.accepted_kinds.contains(&AssetKind::Data);
    if let Some(item) = items.iter().find(|item| {
        !accepts_any
            && !request
                .accepted_kinds
                .iter()
                .any(|kind| item.conforms_to(*kind))
    }) {
        return Err(PickerError::SurfaceContract(format!(
            "条目 {} 不属于请求的类型 {:?}",
            item.label(),
            request.accepted_kinds
        )));
    }

    if policy.crop_mode().is_crop_allowed() && items.len() != 1 {
        return Err(PickerError::SurfaceContract(format!(
            "裁剪模式下只能选择一张图片（当前：{}）",
            items.len()
        )));
    }

    Ok(())
}

fn retry_surface_label(source: SourceKind) -> &'static str {
    match source {
        SourceKind::Camera => "拍照",
        SourceKind::PhotoLibrary | SourceKind::Multimedia => "相册",
        SourceKind::DocumentBrowser => "文档",
    }
}
