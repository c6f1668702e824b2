use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use files_picker::adapters::FsSurface;
use files_picker::error::PickerError;
use files_picker::media::{MediaConfig, MediaError};
use files_picker::model::{FileKind, SelectionResult};
use files_picker::pipeline::{PipelineState, SelectionHandler, SelectionPipeline};
use files_picker::platform::{
    AssetKind, CropEditor, CropOutcome, ItemProvider, PickedItem, PickerSurface, Representation,
    SurfaceOutcome, SurfaceRequest, VideoInspector, VideoTrackInfo,
};
use files_picker::policy::{
    AspectRatio, AspectRatioPolicy, Compression, CropMode, PickerSource, PixelSize, Quality,
    SelectionPolicy, SourceKind,
};
use image::{DynamicImage, GenericImageView, ImageFormat};

// ---------------------------------------------------------------------------
// test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("events lock").push(event.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.0.lock().expect("events lock").clone()
    }

    fn count(&self, name: &str) -> usize {
        self.snapshot().iter().filter(|e| e.starts_with(name)).count()
    }
}

struct RecordingHandler {
    events: Arc<Events>,
    result: Mutex<Option<SelectionResult>>,
}

impl RecordingHandler {
    fn new(events: Arc<Events>) -> Self {
        Self {
            events,
            result: Mutex::new(None),
        }
    }

    fn take_result(&self) -> SelectionResult {
        self.result
            .lock()
            .expect("result lock")
            .take()
            .expect("on_select was called")
    }
}

impl SelectionHandler for RecordingHandler {
    fn on_select(&self, result: SelectionResult) {
        self.events.push(format!("select:{}", result.len()));
        *self.result.lock().expect("result lock") = Some(result);
    }

    fn on_cancel(&self) {
        self.events.push("cancel");
    }

    fn on_start_processing(&self) {
        self.events.push("start");
    }

    fn on_end_processing(&self) {
        self.events.push("end");
    }
}

struct ScriptedSurface {
    outcomes: Mutex<VecDeque<SurfaceOutcome>>,
    requests: Mutex<Vec<SurfaceRequest>>,
    dismissed: AtomicBool,
}

impl ScriptedSurface {
    fn new(outcomes: Vec<SurfaceOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
            dismissed: AtomicBool::new(false),
        }
    }

    fn requests(&self) -> Vec<SurfaceRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl PickerSurface for ScriptedSurface {
    async fn present(&self, request: &SurfaceRequest) -> SurfaceOutcome {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or(SurfaceOutcome::Cancelled)
    }

    async fn dismiss(&self) {
        self.dismissed.store(true, Ordering::SeqCst);
    }
}

struct MemoryItem {
    label: String,
    kinds: Vec<AssetKind>,
    bytes: Bytes,
}

#[async_trait]
impl ItemProvider for MemoryItem {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn conforms_to(&self, kind: AssetKind) -> bool {
        self.kinds.contains(&kind)
    }

    async fn load_representation(&self, _kind: AssetKind) -> Result<Representation, MediaError> {
        Ok(Representation::Bytes(self.bytes.clone()))
    }
}

fn png_bytes(width: u32, height: u32) -> Bytes {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("encode png");
    Bytes::from(buffer.into_inner())
}

fn image_item(label: &str, width: u32, height: u32) -> PickedItem {
    Arc::new(MemoryItem {
        label: label.to_string(),
        kinds: vec![AssetKind::Image],
        bytes: png_bytes(width, height),
    })
}

fn broken_item(label: &str) -> PickedItem {
    Arc::new(MemoryItem {
        label: label.to_string(),
        kinds: vec![AssetKind::Image],
        bytes: Bytes::from_static(b"definitely not an image"),
    })
}

fn video_item(label: &str) -> PickedItem {
    Arc::new(MemoryItem {
        label: label.to_string(),
        kinds: vec![AssetKind::Movie],
        bytes: Bytes::from_static(b"\0\0\0\x18ftypmp42movie"),
    })
}

struct FakeInspector;

#[async_trait]
impl VideoInspector for FakeInspector {
    async fn track_info(&self, _path: &Path) -> Result<Option<VideoTrackInfo>, MediaError> {
        Ok(None)
    }

    async fn frame_at(&self, _path: &Path, _time: Duration) -> Result<DynamicImage, MediaError> {
        Ok(DynamicImage::new_rgb8(640, 360))
    }
}

struct ScriptedCrop {
    outcomes: Mutex<VecDeque<CropOutcome>>,
    events: Arc<Events>,
}

#[async_trait]
impl CropEditor for ScriptedCrop {
    async fn crop(&self, _image: DynamicImage, _policy: &AspectRatioPolicy) -> CropOutcome {
        assert_eq!(self.events.count("select"), 0, "select fired before crop resolved");
        self.events.push("crop");
        self.outcomes
            .lock()
            .expect("crop lock")
            .pop_front()
            .unwrap_or(CropOutcome::Cancelled)
    }
}

fn pipeline_with(config: MediaConfig, crop: Vec<CropOutcome>, events: &Arc<Events>) -> SelectionPipeline {
    SelectionPipeline::new(
        config,
        Arc::new(FakeInspector),
        Arc::new(ScriptedCrop {
            outcomes: Mutex::new(crop.into()),
            events: Arc::clone(events),
        }),
    )
}

fn photos_policy(limit: u32, crop_mode: CropMode) -> SelectionPolicy {
    SelectionPolicy::new(
        SourceKind::PhotoLibrary,
        limit,
        crop_mode,
        Compression::Compressed {
            max_size: PixelSize::new(1920, 1080),
            quality: Quality::Medium,
        },
    )
    .expect("valid policy")
}

fn square_crop() -> CropMode {
    CropMode::Allowed(AspectRatioPolicy::Fixed(AspectRatio::SQUARE))
}

fn sizes(result: &SelectionResult) -> Vec<PixelSize> {
    let mut sizes: Vec<PixelSize> = result
        .iter()
        .filter_map(|file| file.as_image().map(|image| image.size))
        .collect();
    sizes.sort_by_key(|size| (size.width, size.height));
    sizes
}

// ---------------------------------------------------------------------------
// batch path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn photo_library_batch_fits_each_image_to_its_orientation() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![
        image_item("landscape", 4000, 3000),
        image_item("small", 800, 600),
        image_item("portrait", 3000, 4000),
    ])]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    let state = pipeline
        .run(&photos_policy(3, CropMode::NotAllowed), &surface, &handler)
        .await
        .expect("run pipeline");

    assert_eq!(state, PipelineState::Done);
    assert_eq!(events.snapshot(), vec!["start", "end", "select:3"]);

    let result = handler.take_result();
    assert!(result.failures.is_empty());
    assert_eq!(
        sizes(&result),
        vec![
            PixelSize::new(800, 600),
            PixelSize::new(1080, 1440),
            PixelSize::new(1440, 1080),
        ]
    );
    for file in result.iter() {
        assert_eq!(file.name, "image");
        assert_eq!(file.format().map(|f| f.mime_type.as_str()), Some("image/jpeg"));
    }
}

#[tokio::test]
async fn failed_items_shorten_the_result_without_erroring() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![
        image_item("a", 64, 48),
        broken_item("b"),
        image_item("c", 48, 64),
        broken_item("d"),
        image_item("e", 32, 32),
    ])]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    pipeline
        .run(&photos_policy(5, CropMode::NotAllowed), &surface, &handler)
        .await
        .expect("run pipeline");

    let result = handler.take_result();
    assert_eq!(result.len(), 3);
    let mut failed: Vec<&str> = result.failures.iter().map(|f| f.item.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["b", "d"]);
}

#[tokio::test]
async fn original_compression_keeps_dimensions() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![image_item("a", 1200, 900)])]);
    let handler = RecordingHandler::new(Arc::clone(&events));
    let policy = SelectionPolicy::new(
        SourceKind::PhotoLibrary,
        1,
        CropMode::NotAllowed,
        Compression::Original,
    )
    .expect("valid policy");

    pipeline.run(&policy, &surface, &handler).await.expect("run");

    assert_eq!(sizes(&handler.take_result()), vec![PixelSize::new(1200, 900)]);
}

#[tokio::test]
async fn multimedia_batch_mixes_images_and_videos() {
    let staging = tempfile::tempdir().expect("tempdir");
    let config = MediaConfig {
        staging_dir: Some(staging.path().to_path_buf()),
        ..MediaConfig::default()
    };
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(config, Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![
        image_item("photo", 300, 200),
        video_item("clip"),
    ])]);
    let handler = RecordingHandler::new(Arc::clone(&events));
    let policy = SelectionPolicy::try_from(PickerSource::Multimedia {
        selection_limit: 5,
        image_compression: Compression::Compressed {
            max_size: PixelSize::new(320, 180),
            quality: Quality::Low,
        },
    })
    .expect("valid policy");

    pipeline.run(&policy, &surface, &handler).await.expect("run");

    assert_eq!(
        surface.requests()[0].accepted_kinds,
        vec![AssetKind::Image, AssetKind::Movie]
    );
    let result = handler.take_result();
    assert_eq!(result.len(), 2);

    let video = result
        .iter()
        .find_map(|file| file.as_video())
        .expect("video in result");
    assert_eq!(video.size, PixelSize::new(320, 180));
    assert_eq!(video.preview_size, PixelSize::new(320, 180));
    assert_eq!(&video.data[..], b"\0\0\0\x18ftypmp42movie");
    let staged_path = video
        .location
        .as_ref()
        .expect("staged file")
        .path()
        .to_path_buf();
    assert!(staged_path.exists());

    drop(result);
    assert!(!staged_path.exists(), "staged video removed with the result");
}

#[tokio::test]
async fn document_browser_returns_files_untouched() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let document: PickedItem = Arc::new(MemoryItem {
        label: "notes".to_string(),
        kinds: vec![AssetKind::Data],
        bytes: Bytes::from_static(b"%PDF-1.5 body"),
    });
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![document])]);
    let handler = RecordingHandler::new(Arc::clone(&events));
    let policy = SelectionPolicy::try_from(PickerSource::Files {
        allow_multiple_selection: true,
    })
    .expect("valid policy");

    pipeline.run(&policy, &surface, &handler).await.expect("run");

    let result = handler.take_result();
    let file = result.iter().next().expect("one document");
    assert!(matches!(file.kind, FileKind::Other(_)));
    assert_eq!(file.name, "notes");
    assert_eq!(&file.data()[..], b"%PDF-1.5 body");
    assert_eq!(file.format().map(|f| f.extension.as_str()), Some("pdf"));
}

#[tokio::test]
async fn camera_capture_without_crop_skips_the_load_cap() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Captured(DynamicImage::new_rgb8(
        4000, 3000,
    ))]);
    let handler = RecordingHandler::new(Arc::clone(&events));
    let policy = SelectionPolicy::try_from(PickerSource::Camera {
        crop_mode: CropMode::NotAllowed,
        compression: Compression::compressed(),
    })
    .expect("valid policy");

    let state = pipeline.run(&policy, &surface, &handler).await.expect("run");

    assert_eq!(state, PipelineState::Done);
    assert_eq!(events.snapshot(), vec!["start", "end", "select:1"]);
    assert!(surface.dismissed.load(Ordering::SeqCst));
    assert_eq!(sizes(&handler.take_result()), vec![PixelSize::new(1440, 1080)]);
}

#[tokio::test]
async fn local_files_of_other_kinds_do_not_abort_a_photo_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let photo = dir.path().join("a.png");
    DynamicImage::new_rgb8(64, 48)
        .save_with_format(&photo, ImageFormat::Png)
        .expect("write png");
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, b"shopping list").expect("write notes");

    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = FsSurface::new(vec![photo, notes]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    let state = pipeline
        .run(&photos_policy(5, CropMode::NotAllowed), &surface, &handler)
        .await
        .expect("run pipeline");

    assert_eq!(state, PipelineState::Done);
    assert_eq!(events.snapshot(), vec!["start", "end", "select:1"]);
    let result = handler.take_result();
    assert!(result.failures.is_empty());
    assert_eq!(sizes(&result), vec![PixelSize::new(64, 48)]);
}

// ---------------------------------------------------------------------------
// cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelling_the_surface_only_fires_on_cancel() {
    for outcome in [SurfaceOutcome::Cancelled, SurfaceOutcome::Picked(Vec::new())] {
        let events = Arc::new(Events::default());
        let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
        let surface = ScriptedSurface::new(vec![outcome]);
        let handler = RecordingHandler::new(Arc::clone(&events));

        let state = pipeline
            .run(&photos_policy(3, CropMode::NotAllowed), &surface, &handler)
            .await
            .expect("run pipeline");

        assert_eq!(state, PipelineState::Cancelled);
        assert_eq!(events.snapshot(), vec!["cancel"]);
        assert!(surface.dismissed.load(Ordering::SeqCst));
    }
}

// ---------------------------------------------------------------------------
// crop path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn camera_crop_cancel_reopens_capture_instead_of_cancelling() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(
        MediaConfig::default(),
        vec![
            CropOutcome::Cancelled,
            CropOutcome::Cropped(DynamicImage::new_rgb8(300, 300)),
        ],
        &events,
    );
    let surface = ScriptedSurface::new(vec![
        SurfaceOutcome::Captured(DynamicImage::new_rgb8(400, 300)),
        SurfaceOutcome::Captured(DynamicImage::new_rgb8(400, 300)),
    ]);
    let handler = RecordingHandler::new(Arc::clone(&events));
    let policy = SelectionPolicy::try_from(PickerSource::Camera {
        crop_mode: square_crop(),
        compression: Compression::compressed(),
    })
    .expect("valid policy");

    let state = pipeline.run(&policy, &surface, &handler).await.expect("run");

    assert_eq!(state, PipelineState::Done);
    assert_eq!(events.snapshot(), vec!["crop", "crop", "select:1"]);

    let requests = surface.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].is_retry);
    assert!(requests[1].is_retry);
    assert_eq!(requests[1].source, SourceKind::Camera);

    assert_eq!(sizes(&handler.take_result()), vec![PixelSize::new(300, 300)]);
}

#[tokio::test]
async fn library_crop_delivers_single_cropped_image() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(
        MediaConfig::default(),
        vec![CropOutcome::Cropped(DynamicImage::new_rgb8(500, 500))],
        &events,
    );
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![image_item("a", 800, 500)])]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    let state = pipeline
        .run(&photos_policy(1, square_crop()), &surface, &handler)
        .await
        .expect("run");

    assert_eq!(state, PipelineState::Done);
    assert_eq!(events.snapshot(), vec!["crop", "select:1"]);
    let result = handler.take_result();
    let image = result.iter().next().and_then(|f| f.as_image()).expect("image");
    assert_eq!(image.image.dimensions(), (500, 500));
}

#[tokio::test]
async fn library_crop_cancel_then_surface_cancel_fires_on_cancel_once() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), vec![CropOutcome::Cancelled], &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![image_item("a", 64, 64)])]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    let state = pipeline
        .run(&photos_policy(1, square_crop()), &surface, &handler)
        .await
        .expect("run");

    assert_eq!(state, PipelineState::Cancelled);
    assert_eq!(events.snapshot(), vec!["crop", "cancel"]);
    assert_eq!(surface.requests().len(), 2);
}

// ---------------------------------------------------------------------------
// contract violations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn surface_returning_too_many_items_is_rejected() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![
        image_item("a", 8, 8),
        image_item("b", 8, 8),
        image_item("c", 8, 8),
    ])]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    let result = pipeline
        .run(&photos_policy(2, CropMode::NotAllowed), &surface, &handler)
        .await;

    assert!(matches!(result, Err(PickerError::SurfaceContract(_))));
    assert!(events.snapshot().is_empty());
    assert!(surface.dismissed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn video_in_crop_session_is_rejected() {
    let events = Arc::new(Events::default());
    let pipeline = pipeline_with(MediaConfig::default(), Vec::new(), &events);
    let surface = ScriptedSurface::new(vec![SurfaceOutcome::Picked(vec![video_item("clip")])]);
    let handler = RecordingHandler::new(Arc::clone(&events));

    let result = pipeline
        .run(&photos_policy(1, square_crop()), &surface, &handler)
        .await;

    assert!(matches!(result, Err(PickerError::SurfaceContract(_))));
    assert!(events.snapshot().is_empty());
}

#[test]
fn invalid_policies_are_rejected_before_any_surface() {
    assert!(SelectionPolicy::new(SourceKind::PhotoLibrary, 3, square_crop(), Compression::compressed()).is_err());
    assert!(SelectionPolicy::new(SourceKind::Multimedia, 1, square_crop(), Compression::compressed()).is_err());
    assert!(SelectionPolicy::new(SourceKind::Camera, 2, CropMode::NotAllowed, Compression::compressed()).is_err());
    assert!(SelectionPolicy::new(SourceKind::PhotoLibrary, 0, CropMode::NotAllowed, Compression::compressed()).is_err());
}
