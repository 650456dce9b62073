//! 客户端层错误类型定义

use std::path::PathBuf;
use tgdrive_can::CanError;
use tgdrive_protocol::ProtocolError;
use thiserror::Error;

/// 客户端层错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// CAN 传输错误
    #[error("CAN transport error: {0}")]
    Can(#[from] CanError),

    /// 协议错误（如当前模式不支持构建指令）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置文件读写失败
    #[error("Config file '{path}': {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件格式错误
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// 配置值非法
    #[error("Invalid config value for '{key}': {message}")]
    InvalidConfig { key: String, message: String },

    /// 读取线程已退出
    #[error("Reader thread error: {0}")]
    ReaderThread(String),
}

#[cfg(test)]
mod tests {
    use super::ClientError;
    use tgdrive_can::CanError;
    use tgdrive_protocol::{MotionMode, ProtocolError};

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Can(CanError::Timeout);
        assert_eq!(err.to_string(), "CAN transport error: Read timeout");

        let err = ClientError::Protocol(ProtocolError::UnsupportedMode(MotionMode::Jog));
        assert_eq!(err.to_string(), "Protocol error: Unsupported motion mode: Jog");

        let err = ClientError::InvalidConfig {
            key: "queue_capacity".to_string(),
            message: "must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid config value for 'queue_capacity': must be at least 1"
        );
    }

    #[test]
    fn test_from_conversions() {
        let err: ClientError = CanError::Disconnected.into();
        assert!(matches!(err, ClientError::Can(CanError::Disconnected)));

        let err: ClientError = ProtocolError::OutOfRange { value: -1 }.into();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
