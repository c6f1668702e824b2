//! # 视频归一化模块
//!
//! ## 设计思路
//!
//! 视频本身从不重新编码，只对首帧预览图执行与图片相同的缩放/编码策略。
//! 首帧提取失败时整个视频被丢弃，不产生半成品结果。
//!
//! ## 实现思路
//!
//! 1. 提取 0 秒处的预览帧（已应用轨道变换）
//! 2. 解析分辨率：轨道自然尺寸 × 变换，失败时回退到预览帧尺寸
//! 3. 预览帧交给 `ImageNormalizer`
//! 4. 读入完整视频字节（受 `max_video_bytes` 限制）

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;

use super::image_normalizer::ImageNormalizer;
use super::{MediaConfig, MediaError, StagedFile};
use crate::model::{FileKind, FormatTag, NormalizedFile, VideoFile};
use crate::platform::VideoInspector;
use crate::policy::{Compression, PixelSize};

pub(crate) const VIDEO_FILE_NAME: &str = "video";

#[derive(Clone)]
pub struct VideoNormalizer {
    inspector: Arc<dyn VideoInspector>,
    images: ImageNormalizer,
    max_video_bytes: u64,
}

impl VideoNormalizer {
    pub fn new(config: &MediaConfig, inspector: Arc<dyn VideoInspector>) -> Self {
        Self {
            inspector,
            images: ImageNormalizer::new(config),
            max_video_bytes: config.max_video_bytes,
        }
    }

    pub async fn normalize(
        &self,
        video: StagedFile,
        compression: Compression,
    ) -> Result<NormalizedFile, MediaError> {
        let start = Instant::now();
        let path = video.path().to_path_buf();

        let frame = self
            .inspector
            .frame_at(&path, Duration::ZERO)
            .await
            .map_err(|e| MediaError::Video(format!("提取预览帧失败：{}", e)))?;

        let resolution = match self.inspector.track_info(&path).await {
            Ok(Some(info)) => info.display_size(),
            Ok(None) => None,
            Err(err) => {
                log::debug!("读取视频轨道信息失败：{}", err);
                None
            }
        };

        let images = self.images.clone();
        let preview =
            tokio::task::spawn_blocking(move || images.encode(frame, compression)).await??;

        let size = resolution.unwrap_or_else(|| {
            log::debug!("🎞️ 无法计算视频分辨率，回退到预览图尺寸 {}", preview.size);
            preview.size
        });

        let data = self.read_video_bytes(&video).await?;
        let format = FormatTag::resolve(video.extension().as_deref(), &data);

        log::debug!(
            "🎞️ 视频归一化完成 - size={} preview={} bytes={} elapsed={}ms",
            size,
            preview.size,
            data.len(),
            start.elapsed().as_millis()
        );

        Ok(NormalizedFile::new(
            VIDEO_FILE_NAME,
            FileKind::Video(VideoFile {
                location: Some(video),
                data,
                preview_data: preview.data,
                preview_image: Arc::new(preview.image),
                size,
                preview_size: preview.size,
                format,
                preview_format: FormatTag::jpeg(),
            }),
        ))
    }

    async fn read_video_bytes(&self, video: &StagedFile) -> Result<Bytes, MediaError> {
        let metadata = tokio::fs::metadata(video.path())
            .await
            .map_err(|e| MediaError::FileSystem(format!("无法读取视频文件信息：{}", e)))?;

        if metadata.len() > self.max_video_bytes {
            return Err(MediaError::ResourceLimit(format!(
                "视频过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.max_video_bytes as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = tokio::fs::read(video.path())
            .await
            .map_err(|e| MediaError::FileSystem(format!("无法读取视频文件：{}", e)))?;
        Ok(Bytes::from(bytes))
    }
}
