//! 宿主适配器：让选择流程可以脱离移动端界面在本地运行。
//!
//! - `fs`：本地文件作为选择结果
//! - `ffmpeg`：基于系统 ffmpeg 的视频解析
//! - `crop`：按比例居中的自动裁剪

mod crop;
mod ffmpeg;
mod fs;

pub use crop::{CenterCropEditor, centered_crop_rect};
pub use ffmpeg::FfmpegInspector;
pub use fs::{FsItem, FsSurface};
