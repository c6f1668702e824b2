//! # 文件选择归一化工具：命令行入口
//!
//! 本文件仅负责参数解析、日志初始化与结果落盘。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, ValueEnum};
use files_picker::adapters::{CenterCropEditor, FfmpegInspector, FsSurface};
use files_picker::error::PickerError;
use files_picker::media::{MediaAdvancedConfig, MediaConfig, PerformanceProfile};
use files_picker::model::{FileKind, NormalizedFile, SelectionResult};
use files_picker::pipeline::{PipelineState, SelectionCallbacks, SelectionPipeline};
use files_picker::policy::{
    AspectRatio, AspectRatioPolicy, Compression, CropMode, PickerSource, PixelSize, PolicyError,
    Quality, SelectionPolicy, SourceKind,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    /// 仅图片
    Photos,
    /// 图片 + 视频
    Multimedia,
    /// 任意文档，原样输出
    Files,
}

#[derive(Parser)]
#[command(name = "files-picker")]
#[command(version)]
#[command(about = "Normalize picked photos, videos and documents into a uniform output")]
struct Cli {
    /// 选择来源
    #[arg(long, value_enum, default_value = "photos")]
    source: SourceArg,

    /// 最多选择的文件数
    #[arg(long, default_value_t = 10)]
    limit: u32,

    /// 压缩目标框（横向，纵向图片自动旋转），格式 WxH
    #[arg(long, default_value = "1920x1080", value_parser = parse_size)]
    max: PixelSize,

    /// 压缩质量：low / medium / high / original
    #[arg(long, default_value = "medium")]
    quality: Quality,

    /// 不缩放，仅以最高质量重新编码
    #[arg(long)]
    original: bool,

    /// 按固定比例居中裁剪（需要 --limit 1），格式 W:H
    #[arg(long, value_parser = AspectRatio::parse)]
    crop: Option<AspectRatio>,

    /// 输出目录
    #[arg(long, default_value = "picked")]
    out: PathBuf,

    /// 性能档位：quality / balanced / speed
    #[arg(long)]
    profile: Option<String>,

    /// 高级配置 JSON 文件
    #[arg(long)]
    config: Option<PathBuf>,

    /// 待处理的文件
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// 输出到 stdout 的单个文件摘要。
#[derive(Serialize)]
struct OutputEntry {
    id: String,
    kind: &'static str,
    path: PathBuf,
    width: Option<u32>,
    height: Option<u32>,
    bytes: usize,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<PipelineState, PickerError> {
    let config = build_config(&cli)?;
    let policy = build_policy(&cli)?;

    let pipeline = SelectionPipeline::new(
        config,
        Arc::new(FfmpegInspector::default()),
        Arc::new(CenterCropEditor),
    );
    let surface = FsSurface::new(cli.files.clone());

    let collected: Arc<Mutex<Option<SelectionResult>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&collected);
    let handler = SelectionCallbacks::new(move |result| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(result);
        }
    })
    .with_cancel(|| log::info!("🚫 没有选择任何文件"))
    .with_start_processing(|| log::info!("⏳ 开始处理"))
    .with_end_processing(|| log::info!("⌛ 处理结束"));

    let state = pipeline.run(&policy, &surface, &handler).await?;

    let result = collected
        .lock()
        .map_err(|_| PickerError::Config("结果锁已中毒".to_string()))?
        .take();
    if let Some(result) = result {
        write_outputs(&cli.out, result).await?;
    }

    Ok(state)
}

fn build_config(cli: &Cli) -> Result<MediaConfig, PickerError> {
    let mut config = MediaConfig::default();

    if let Some(profile) = &cli.profile {
        config.apply_performance_profile(PerformanceProfile::from_str(profile)?);
    }
    if let Some(path) = &cli.config {
        let advanced = MediaAdvancedConfig::from_json_file(path)?;
        config.apply_advanced(&advanced)?;
        log::info!("⚙️ 已加载配置文件：{}", path.display());
    }

    Ok(config)
}

fn build_policy(cli: &Cli) -> Result<SelectionPolicy, PickerError> {
    let compression = if cli.original {
        Compression::Original
    } else {
        Compression::Compressed {
            max_size: cli.max,
            quality: cli.quality,
        }
    };
    let crop_mode = cli
        .crop
        .map(|ratio| CropMode::Allowed(AspectRatioPolicy::Fixed(ratio)))
        .unwrap_or(CropMode::NotAllowed);

    let source = match cli.source {
        SourceArg::Photos => PickerSource::Photos {
            selection_limit: cli.limit,
            crop_mode,
            compression,
        },
        SourceArg::Multimedia if crop_mode.is_crop_allowed() => {
            return Err(PolicyError::CropUnsupportedSource(SourceKind::Multimedia).into());
        }
        SourceArg::Multimedia => PickerSource::Multimedia {
            selection_limit: cli.limit,
            image_compression: compression,
        },
        SourceArg::Files if crop_mode.is_crop_allowed() => {
            return Err(PolicyError::CropUnsupportedSource(SourceKind::DocumentBrowser).into());
        }
        SourceArg::Files => PickerSource::Files {
            allow_multiple_selection: cli.limit > 1,
        },
    };

    Ok(SelectionPolicy::try_from(source)?)
}

fn parse_size(value: &str) -> Result<PixelSize, String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("尺寸格式应为 WxH：{}", value))?;
    let width = w.trim().parse::<u32>().map_err(|e| format!("宽度无效：{}", e))?;
    let height = h.trim().parse::<u32>().map_err(|e| format!("高度无效：{}", e))?;
    Ok(PixelSize::new(width, height))
}

async fn write_outputs(out: &Path, result: SelectionResult) -> Result<(), PickerError> {
    tokio::fs::create_dir_all(out).await?;

    for failure in &result.failures {
        log::warn!(
            "⚠️ 未输出：{}（{} / {}）：{}",
            failure.item,
            failure.stage(),
            failure.error.code(),
            failure.error
        );
    }

    let mut entries = Vec::with_capacity(result.len());
    for file in result {
        entries.push(write_file(out, &file).await?);
    }

    let summary = serde_json::to_string_pretty(&entries)
        .map_err(|e| PickerError::Config(format!("输出摘要序列化失败：{}", e)))?;
    println!("{}", summary);
    Ok(())
}

async fn write_file(out: &Path, file: &NormalizedFile) -> Result<OutputEntry, PickerError> {
    let short_id = file.id.get(..8).unwrap_or(&file.id);
    let extension = file
        .format()
        .map(|format| format.extension.clone())
        .unwrap_or_else(|| "bin".to_string());
    let path = out.join(format!("{}-{}.{}", file.name, short_id, extension));

    tokio::fs::write(&path, file.data()).await?;

    let (kind, size) = match &file.kind {
        FileKind::Image(image) => ("image", Some(image.size)),
        FileKind::Video(video) => {
            let preview = out.join(format!("{}-{}-preview.jpg", file.name, short_id));
            tokio::fs::write(&preview, &video.preview_data).await?;
            ("video", Some(video.size))
        }
        FileKind::Other(_) => ("other", None),
    };

    log::info!("💾 已写入 {}", path.display());
    Ok(OutputEntry {
        id: file.id.clone(),
        kind,
        path,
        width: size.map(|s| s.width),
        height: size.map(|s| s.height),
        bytes: file.data().len(),
    })
}
