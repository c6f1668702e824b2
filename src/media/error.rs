//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载素材加载与归一化链路中的所有错误来源。
//! 这些错误只会落到 `SelectionResult::failures`，不会中断整批处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。

/// 素材处理统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("加载错误：{0}")]
    Load(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("视频错误：{0}")]
    Video(String),

    #[error("格式错误：{0}")]
    UnsupportedType(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("配置错误：{0}")]
    InvalidConfig(String),
}

impl MediaError {
    /// 稳定错误码，供宿主侧做分支或埋点。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load(_) => "E_LOAD",
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::Video(_) => "E_VIDEO",
            Self::UnsupportedType(_) => "E_UNSUPPORTED",
            Self::FileSystem(_) => "E_FS",
            Self::ResourceLimit(_) => "E_LIMIT",
            Self::InvalidConfig(_) => "E_CONFIG",
        }
    }

    /// 出错的处理阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Load(_) | Self::UnsupportedType(_) | Self::FileSystem(_) => "load",
            Self::Decode(_) | Self::ResourceLimit(_) => "decode",
            Self::Encode(_) => "encode",
            Self::Video(_) => "video",
            Self::InvalidConfig(_) => "config",
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(error: std::io::Error) -> Self {
        Self::FileSystem(error.to_string())
    }
}

impl From<tokio::task::JoinError> for MediaError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Load(format!("后台任务异常退出：{}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_stages_are_stable() {
        let err = MediaError::Encode("unsupported pixel format".to_string());
        assert_eq!(err.code(), "E_ENCODE");
        assert_eq!(err.stage(), "encode");

        let io = MediaError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.code(), "E_FS");
        assert_eq!(io.stage(), "load");
    }
}
