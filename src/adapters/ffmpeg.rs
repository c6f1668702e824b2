//! # ffmpeg 视频解析适配器
//!
//! ## 设计思路
//!
//! 通过系统 `ffprobe` / `ffmpeg` 可执行文件完成视频轨道解析与抽帧，不链接任何编解码库。
//!
//! ## 实现思路
//!
//! - `ffprobe -show_streams -of json` 读取首个视频流的宽高与旋转角度
//!   （优先 `side_data_list[].rotation`，其次旧式 `tags.rotate`）。
//! - `ffmpeg -frames:v 1 -f image2pipe -vcodec png -` 抽取单帧；
//!   ffmpeg 默认自动旋转，输出的帧已应用显示矩阵。

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::DynamicImage;
use serde::Deserialize;
use tokio::process::Command;

use crate::media::MediaError;
use crate::platform::{AffineTransform, VideoInspector, VideoTrackInfo};

#[derive(Debug, Clone)]
pub struct FfmpegInspector {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl Default for FfmpegInspector {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegInspector {
    pub fn new(ffprobe: impl Into<PathBuf>, ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    async fn run(program: &Path, args: &[&OsStr]) -> Result<Vec<u8>, MediaError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| MediaError::Video(format!("无法启动 {}：{}", program.display(), e)))?;

        if !output.status.success() {
            return Err(MediaError::Video(format!(
                "{} 执行失败（{}）：{}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl VideoInspector for FfmpegInspector {
    async fn track_info(&self, path: &Path) -> Result<Option<VideoTrackInfo>, MediaError> {
        let stdout = Self::run(
            &self.ffprobe,
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-select_streams"),
                OsStr::new("v:0"),
                OsStr::new("-show_streams"),
                OsStr::new("-of"),
                OsStr::new("json"),
                path.as_os_str(),
            ],
        )
        .await?;

        parse_track_info(&String::from_utf8_lossy(&stdout))
    }

    async fn frame_at(&self, path: &Path, time: Duration) -> Result<DynamicImage, MediaError> {
        let seek = format!("{:.3}", time.as_secs_f64());
        let stdout = Self::run(
            &self.ffmpeg,
            &[
                OsStr::new("-v"),
                OsStr::new("error"),
                OsStr::new("-ss"),
                OsStr::new(&seek),
                OsStr::new("-i"),
                path.as_os_str(),
                OsStr::new("-frames:v"),
                OsStr::new("1"),
                OsStr::new("-f"),
                OsStr::new("image2pipe"),
                OsStr::new("-vcodec"),
                OsStr::new("png"),
                OsStr::new("-"),
            ],
        )
        .await?;

        if stdout.is_empty() {
            return Err(MediaError::Video("ffmpeg 未输出任何帧".to_string()));
        }

        image::load_from_memory(&stdout)
            .map_err(|e| MediaError::Video(format!("预览帧解码失败：{}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

impl ProbeStream {
    fn rotation_degrees(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.get("rotate").and_then(|v| v.trim().parse().ok()))
            .unwrap_or(0.0)
    }
}

/// 解析 `ffprobe -of json` 输出中的首个视频流。
pub(crate) fn parse_track_info(json: &str) -> Result<Option<VideoTrackInfo>, MediaError> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::Video(format!("ffprobe 输出解析失败：{}", e)))?;

    let track = probe
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref().is_none_or(|kind| kind == "video"))
        .and_then(|stream| match (stream.width, stream.height) {
            (Some(width), Some(height)) => Some(VideoTrackInfo {
                natural_width: width as f64,
                natural_height: height as f64,
                transform: AffineTransform::from_rotation_degrees(stream.rotation_degrees()),
            }),
            _ => None,
        });

    Ok(track)
}
