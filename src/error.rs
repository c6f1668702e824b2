//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `PickerError` 枚举，只承载“整次选择无法进行”的错误：
//! 策略非法、宿主协作方违反约定、状态机越界、配置或 I/O 失败。
//! 单个条目的加载 / 归一化失败不在此列，它们记录在 `SelectionResult::failures` 中。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `PolicyError` / `MediaError` / `io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于 WebView 宿主直接透传。

use serde::Serialize;

use crate::media::MediaError;
use crate::pipeline::PipelineState;
use crate::policy::PolicyError;

/// 选择流程统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum PickerError {
    /// 选择策略非法（在展示任何界面之前返回）
    #[error("选择策略非法: {0}")]
    Policy(#[from] PolicyError),

    /// 素材处理配置或暂存目录错误
    #[error("{0}")]
    Media(#[from] MediaError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置读取或写入失败
    #[error("配置错误: {0}")]
    Config(String),

    /// 平台界面返回了与请求不符的结果
    #[error("平台界面违反约定: {0}")]
    SurfaceContract(String),

    /// 状态机出现非法迁移
    #[error("非法状态迁移: {from:?} -> {to:?}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
}

impl Serialize for PickerError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
