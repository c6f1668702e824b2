//! # 选择流程模块（pipeline）
//!
//! ## 设计思路
//!
//! - `state`：受检状态机，约束流程只能沿固定路径推进
//! - `callbacks`：调用方回调接口与闭包实现
//! - `session`：`SelectionPipeline`，串起平台界面、加载、裁剪与归一化
//!
//! ## 新同事快速上手
//!
//! ```text
//! SelectionPolicy + PickerSurface + SelectionHandler
//!    ↓
//! session.rs（配置快照 + 状态机 + 阶段耗时日志）
//!    ├─ media::AssetLoader（并发加载）
//!    ├─ CropEditor（单图裁剪路径）
//!    └─ media::ImageNormalizer / VideoNormalizer（并发归一化）
//!    ↓
//! SelectionHandler::on_select(SelectionResult)
//! ```

mod callbacks;
mod session;
mod state;

pub use callbacks::{SelectionCallbacks, SelectionHandler};
pub use session::{SelectionPipeline, accepted_kinds};
pub use state::PipelineState;
