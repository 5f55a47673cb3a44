//! Defines the custom error type for the `authkeys` crate.

use thiserror::Error;

/// 密钥存储操作可能遇到的错误类型
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid key name \"{name}\": {reason}")]
    InvalidIdentity { name: String, reason: String },

    #[error("Key \"{0}\" already exists. Please delete it first.")]
    AlreadyExists(String),

    #[error("Key \"{0}\" does not exist.")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key file \"{path}\" was rejected: {reason}")]
    FormatRejected { path: String, reason: String },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration file could not be parsed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Service control error: {0}")]
    Service(String),
}

/// 面向调用方的错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidIdentity,
    AlreadyExists,
    NotFound,
    IoFailure,
    FormatRejected,
    Other,
}

impl Error {
    /// 将错误归入粗粒度的分类，供 UI 选择提示方式
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidIdentity { .. } => ErrorKind::InvalidIdentity,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) => ErrorKind::IoFailure,
            Error::FormatRejected { .. } => ErrorKind::FormatRejected,
            Error::KeyGeneration(_)
            | Error::Configuration(_)
            | Error::Json(_)
            | Error::Service(_) => ErrorKind::Other,
        }
    }
}

/// A specialized Result type for key store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn error_kind_mapping() {
        let err = Error::NotFound("teachers/public".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(err.kind(), ErrorKind::IoFailure);

        let err = Error::Configuration("bad".to_string());
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn display_includes_identity() {
        let err = Error::AlreadyExists("teachers/private".to_string());
        assert_eq!(
            err.to_string(),
            "Key \"teachers/private\" already exists. Please delete it first."
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
