//! # TG Drives Client
//!
//! 伺服控制会话层：
//! - [`ControlSession`]: 运动模式选择、参数提交、启动/停止指令发送
//! - [`monitor`]: 入站帧读取线程与诊断回显
//! - [`config`]: 会话配置（TOML）
//!
//! 协议细节（点分八位组编码、帧构建）见 `tgdrive_protocol`，
//! 传输实现见 `tgdrive_can`。

pub mod config;
mod error;
pub mod monitor;
pub mod session;

pub use config::{SessionConfig, TransportKind};
pub use error::ClientError;
pub use monitor::{EchoLine, FrameMonitor, ReaderExit, ReaderHandle, spawn_reader};
pub use session::{ControlSession, SendOutcome};

use tgdrive_can::{CansendTransport, FrameSink};
use tracing::debug;

/// 按配置打开出站传输
///
/// `socketcan` 仅在 Linux 上可用，其他平台返回 `InvalidConfig`。
pub fn open_sink(config: &SessionConfig) -> Result<Box<dyn FrameSink + Send>, ClientError> {
    debug!(
        "Opening {} transport on '{}'",
        config.transport, config.interface
    );
    match config.transport {
        TransportKind::Cansend => Ok(Box::new(CansendTransport::with_program(
            config.cansend_program.clone(),
            config.interface.clone(),
        ))),
        #[cfg(target_os = "linux")]
        TransportKind::Socketcan => Ok(Box::new(tgdrive_can::SocketCanTransport::new(
            config.interface.clone(),
        )?)),
        #[cfg(not(target_os = "linux"))]
        TransportKind::Socketcan => Err(ClientError::InvalidConfig {
            key: "transport".to_string(),
            message: "socketcan is only available on Linux".to_string(),
        }),
    }
}
