//! # 本地文件适配器
//!
//! ## 设计思路
//!
//! 用一组预先给定的本地路径模拟平台选择器：第一次展示时交回全部条目，
//! 之后（例如裁剪取消后的重新展示）视为用户关闭界面。
//!
//! ## 实现思路
//!
//! - 条目类型在构造时通过文件头魔数识别（`infer`），识别失败时回退到扩展名。
//! - 展示时先按请求类型过滤（同平台选择器的类型过滤），再按可选上限截断。
//! - 交回的表示始终是文件路径，由加载器负责读取或暂存。

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::media::MediaError;
use crate::model::FormatTag;
use crate::platform::{
    AssetKind, ItemProvider, PickedItem, PickerSurface, Representation, SurfaceOutcome,
    SurfaceRequest,
};

/// 本地文件条目。
#[derive(Debug, Clone)]
pub struct FsItem {
    path: PathBuf,
    format: Option<FormatTag>,
}

impl FsItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = sniff_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Option<&FormatTag> {
        self.format.as_ref()
    }
}

fn sniff_path(path: &Path) -> Option<FormatTag> {
    let sniffed = infer::get_from_path(path)
        .ok()
        .flatten()
        .map(|kind| FormatTag {
            mime_type: kind.mime_type().to_string(),
            extension: kind.extension().to_string(),
        });

    sniffed.or_else(|| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(FormatTag::from_extension)
    })
}

#[async_trait]
impl ItemProvider for FsItem {
    fn label(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn conforms_to(&self, kind: AssetKind) -> bool {
        match kind {
            AssetKind::Image => self.format.as_ref().is_some_and(FormatTag::is_image),
            AssetKind::Movie => self.format.as_ref().is_some_and(FormatTag::is_video),
            AssetKind::Data => true,
        }
    }

    async fn load_representation(&self, kind: AssetKind) -> Result<Representation, MediaError> {
        if !self.conforms_to(kind) {
            return Err(MediaError::UnsupportedType(format!(
                "{} 不是 {:?}",
                self.path.display(),
                kind
            )));
        }
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(MediaError::FileSystem(format!(
                "文件不存在：{}",
                self.path.display()
            )));
        }
        Ok(Representation::File(self.path.clone()))
    }
}

/// 一次性交回预设文件列表的选择界面。
pub struct FsSurface {
    pending: Mutex<Option<Vec<PathBuf>>>,
}

impl FsSurface {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            pending: Mutex::new(Some(paths)),
        }
    }
}

#[async_trait]
impl PickerSurface for FsSurface {
    async fn present(&self, request: &SurfaceRequest) -> SurfaceOutcome {
        let paths = match self.pending.lock() {
            Ok(mut pending) => pending.take(),
            Err(_) => None,
        };

        let Some(paths) = paths else {
            log::info!("📂 没有更多文件可选，视为取消");
            return SurfaceOutcome::Cancelled;
        };

        let mut items: Vec<PickedItem> = Vec::with_capacity(paths.len());
        for path in paths {
            let item = FsItem::new(path);
            if request
                .accepted_kinds
                .iter()
                .any(|kind| item.conforms_to(*kind))
            {
                items.push(Arc::new(item));
            } else {
                log::warn!(
                    "⚠️ 跳过 {}：不属于请求的类型 {:?}",
                    item.label(),
                    request.accepted_kinds
                );
            }
        }

        let limit = request.selection_limit as usize;
        if items.len() > limit {
            log::warn!(
                "⚠️ 可选文件 {} 个，超过可选上限 {}，只保留前 {} 个",
                items.len(),
                limit,
                limit
            );
            items.truncate(limit);
        }

        log::info!("📂 已选择 {} 个文件（source={}）", items.len(), request.source.as_str());
        SurfaceOutcome::Picked(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::SourceKind;
    use image::{DynamicImage, ImageFormat};

    fn request(limit: u32) -> SurfaceRequest {
        SurfaceRequest {
            source: SourceKind::PhotoLibrary,
            selection_limit: limit,
            accepted_kinds: vec![AssetKind::Image],
            is_retry: false,
        }
    }

    #[test]
    fn kinds_are_sniffed_from_content_before_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let disguised = dir.path().join("photo.bin");
        DynamicImage::new_rgb8(4, 4)
            .save_with_format(&disguised, ImageFormat::Png)
            .expect("write png");
        let movie = dir.path().join("clip.mov");
        std::fs::write(&movie, b"").expect("write empty movie");

        let image_item = FsItem::new(&disguised);
        assert!(image_item.conforms_to(AssetKind::Image));
        assert!(!image_item.conforms_to(AssetKind::Movie));
        assert!(image_item.conforms_to(AssetKind::Data));

        let movie_item = FsItem::new(&movie);
        assert!(movie_item.conforms_to(AssetKind::Movie));
        assert_eq!(movie_item.label(), "clip.mov");
    }

    #[tokio::test]
    async fn surface_delivers_once_then_cancels() {
        let surface = FsSurface::new(vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);

        match surface.present(&request(1)).await {
            SurfaceOutcome::Picked(items) => assert_eq!(items.len(), 1),
            _ => panic!("first presentation picks files"),
        }
        assert!(matches!(
            surface.present(&request(1)).await,
            SurfaceOutcome::Cancelled
        ));
    }

    #[tokio::test]
    async fn files_outside_the_requested_kinds_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let photo = dir.path().join("a.png");
        DynamicImage::new_rgb8(4, 4)
            .save_with_format(&photo, ImageFormat::Png)
            .expect("write png");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"plain text").expect("write notes");

        let surface = FsSurface::new(vec![notes, photo]);
        match surface.present(&request(1)).await {
            SurfaceOutcome::Picked(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].label(), "a.png");
            }
            _ => panic!("the png is still picked"),
        }
    }

    #[tokio::test]
    async fn missing_file_fails_to_load() {
        let item = FsItem::new("/definitely/not/here.pdf");
        let result = item.load_representation(AssetKind::Data).await;
        assert!(matches!(result, Err(MediaError::FileSystem(_))));
    }
}
