//! 调用方回调。
//!
//! `SelectionHandler` 面向需要自定义类型的宿主；`SelectionCallbacks`
//! 用闭包拼装，适合一次性调用场景。

use crate::model::SelectionResult;

/// 一次选择流程对调用方的通知。
///
/// - `on_select`：每次成功完成恰好一次（结果可能为空）
/// - `on_cancel`：用户未选择任何内容而关闭界面时恰好一次
/// - `on_start_processing` / `on_end_processing`：批处理前后各一次，裁剪路径不触发
pub trait SelectionHandler: Send + Sync {
    fn on_select(&self, result: SelectionResult);

    fn on_cancel(&self);

    fn on_start_processing(&self) {}

    fn on_end_processing(&self) {}
}

type Callback = Box<dyn Fn() + Send + Sync>;
type SelectCallback = Box<dyn Fn(SelectionResult) + Send + Sync>;

/// 基于闭包的回调集合。
///
/// # 示例
/// ```rust
/// use files_picker::pipeline::{SelectionCallbacks, SelectionHandler};
///
/// let callbacks = SelectionCallbacks::new(|result| println!("{} files", result.len()))
///     .with_cancel(|| println!("cancelled"));
/// callbacks.on_cancel();
/// ```
pub struct SelectionCallbacks {
    select: SelectCallback,
    cancel: Option<Callback>,
    start: Option<Callback>,
    end: Option<Callback>,
}

impl SelectionCallbacks {
    pub fn new(on_select: impl Fn(SelectionResult) + Send + Sync + 'static) -> Self {
        Self {
            select: Box::new(on_select),
            cancel: None,
            start: None,
            end: None,
        }
    }

    pub fn with_cancel(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel = Some(Box::new(callback));
        self
    }

    pub fn with_start_processing(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(callback));
        self
    }

    pub fn with_end_processing(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.end = Some(Box::new(callback));
        self
    }
}

impl SelectionHandler for SelectionCallbacks {
    fn on_select(&self, result: SelectionResult) {
        (self.select)(result);
    }

    fn on_cancel(&self) {
        if let Some(cancel) = &self.cancel {
            cancel();
        }
    }

    fn on_start_processing(&self) {
        if let Some(start) = &self.start {
            start();
        }
    }

    fn on_end_processing(&self) {
        if let Some(end) = &self.end {
            end();
        }
    }
}
