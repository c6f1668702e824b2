//! # 文件选择归一化工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              宿主（移动端界面 / WebView / CLI）           │
//! │                                                          │
//! │  PickerSurface ── ItemProvider ── CropEditor             │
//! │  VideoInspector                     SelectionHandler     │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ SelectionPolicy → Result<PipelineState, PickerError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            核心 (Rust)                           │
//! │                                                          │
//! │  ┌─ policy ───── SelectionPolicy（构造即校验）            │
//! │  │                                                       │
//! │  ├─ pipeline ─── 状态机 + 回调 + 阶段耗时                 │
//! │  │                                                       │
//! │  ├─ media ────── 加载·降采样·归一化·暂存                  │
//! │  │   ├─ loader            并发加载（Semaphore 限流）      │
//! │  │   ├─ image_normalizer  方向自适应缩放 + JPEG           │
//! │  │   └─ video_normalizer  预览帧 + 分辨率                 │
//! │  │                                                       │
//! │  ├─ model ────── NormalizedFile / SelectionResult         │
//! │  └─ adapters ─── 本地文件 / ffmpeg / 自动裁剪             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `PickerError`，整次选择无法进行时返回 |
//! | [`policy`] | 来源、可选数量、裁剪与压缩策略及其校验 |
//! | [`model`] | 归一化结果与单项失败记录 |
//! | [`platform`] | 平台界面、条目提供方、视频解析、裁剪的抽象接口 |
//! | [`media`] | 条目加载、图片/视频归一化、视频暂存、性能档位配置 |
//! | [`pipeline`] | 选择流程编排、状态机、调用方回调 |
//! | [`adapters`] | 本地文件选择、ffmpeg 视频解析、居中自动裁剪 |

pub mod adapters;
pub mod error;
pub mod media;
pub mod model;
pub mod pipeline;
pub mod platform;
pub mod policy;
