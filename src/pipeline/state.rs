//! # 选择流程状态机
//!
//! 状态只能沿固定的边迁移，任何越界迁移都会返回 `PickerError::InvalidTransition`。
//!
//! ```text
//! Idle → AwaitingPlatformResult → Cancelled
//!                ↑            ↘
//!                │             BatchReceived → Processing → Done
//!                │                                  ↓
//!                └──────(裁剪取消)── CropResolved ← CropPending
//!                                      ↓
//!                                     Done
//! ```

use serde::Serialize;

use crate::error::PickerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum PipelineState {
    #[default]
    Idle,
    AwaitingPlatformResult,
    Cancelled,
    BatchReceived,
    Processing,
    CropPending,
    CropResolved,
    Done,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Done)
    }

    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        matches!(
            (self, next),
            (Idle, AwaitingPlatformResult)
                | (AwaitingPlatformResult, Cancelled)
                | (AwaitingPlatformResult, BatchReceived)
                | (BatchReceived, Processing)
                | (Processing, CropPending)
                | (Processing, Done)
                | (CropPending, CropResolved)
                | (CropResolved, Done)
                | (CropResolved, AwaitingPlatformResult)
        )
    }

    /// 执行一次受检迁移。
    pub fn transition(&mut self, next: PipelineState) -> Result<(), PickerError> {
        if !self.can_transition_to(next) {
            return Err(PickerError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        log::debug!("🔁 状态迁移：{:?} -> {:?}", self, next);
        *self = next;
        Ok(())
    }
}
