//! # TG Drives CAN Transport Layer
//!
//! CAN 传输协作方抽象：
//!
//! - [`FrameSink`]: 发送帧文本（`"<identifier>#<dotted-octet-payload>"`），即发即弃
//! - [`FrameSource`]: 按到达顺序返回下一帧及其方向标记（TX/RX）
//!
//! ## 实现
//!
//! - `cansend`: 调用 `cansend` 进程发送帧文本
//! - `socketcan`: Linux SocketCAN 字节级收发（仅 Linux）
//! - `queue`: I/O 线程与控制线程之间的单生产者/单消费者队列（满时丢弃最旧帧）
//! - `mock`: 无硬件依赖的内存传输（`mock` feature）

use std::time::Duration;
use thiserror::Error;

// 重新导出协议层类型
pub use tgdrive_protocol::{CommandFrame, ProtocolError, RawFrame};

pub mod cansend;
pub mod queue;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(feature = "mock")]
pub mod mock;

pub use cansend::CansendTransport;
pub use queue::{FrameConsumer, FrameProducer, frame_queue};

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanTransport;

#[cfg(feature = "mock")]
pub use mock::{MockHandle, MockTransport};

/// 待回显 TX 帧的最大数量（超出时丢弃最旧的回显）
pub const MAX_PENDING_ECHOES: usize = 64;

/// CAN 传输层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Protocol Error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Read timeout")]
    Timeout,
    /// 对端（I/O 线程或进程）已断开
    #[error("Transport disconnected")]
    Disconnected,
    /// 外部发送程序返回非零状态
    #[error("Command '{program}' failed: {status}")]
    CommandFailed { program: String, status: String },
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NotUp,
    AccessDenied,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 不可恢复的设备错误（重试无意义）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NotFound | CanDeviceErrorKind::NotUp | CanDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl CanError {
    /// 读取源已无法继续产出帧
    pub fn is_fatal(&self) -> bool {
        match self {
            CanError::Disconnected => true,
            CanError::Device(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// 帧方向标记（仅用于诊断回显）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameDirection {
    /// 本节点发出的帧
    Tx,
    /// 本节点收到的帧
    Rx,
}

impl FrameDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameDirection::Tx => "TX",
            FrameDirection::Rx => "RX",
        }
    }
}

impl std::fmt::Display for FrameDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 带方向标记的入站帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub direction: FrameDirection,
    pub frame: RawFrame,
}

impl ReceivedFrame {
    pub fn tx(frame: RawFrame) -> Self {
        Self {
            direction: FrameDirection::Tx,
            frame,
        }
    }

    pub fn rx(frame: RawFrame) -> Self {
        Self {
            direction: FrameDirection::Rx,
            frame,
        }
    }
}

/// 出站传输：把帧文本原样送上总线
///
/// 即发即弃，不跟踪应答、不重试。
pub trait FrameSink {
    /// 发送帧文本 `"<identifier>#<dotted-octet-payload>"`
    fn send(&mut self, frame_text: &str) -> Result<(), CanError>;

    /// 发送已构建的指令帧
    fn send_frame(&mut self, frame: &CommandFrame) -> Result<(), CanError> {
        self.send(&frame.to_string())
    }
}

impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    fn send(&mut self, frame_text: &str) -> Result<(), CanError> {
        (**self).send(frame_text)
    }
}

/// 入站传输：按到达顺序产出帧
pub trait FrameSource {
    /// 阻塞直到下一帧到达（实现可以带读超时并返回 `CanError::Timeout`）
    fn next_frame(&mut self) -> Result<ReceivedFrame, CanError>;

    fn set_receive_timeout(&mut self, _timeout: Duration) {}

    /// 非阻塞读取
    ///
    /// 默认实现把接收超时设为 `Duration::ZERO` 且不恢复：调用之后
    /// `next_frame` 也变为非阻塞，需要阻塞读取时请重新调用
    /// [`set_receive_timeout`](Self::set_receive_timeout)。
    fn try_next_frame(&mut self) -> Result<Option<ReceivedFrame>, CanError> {
        self.set_receive_timeout(Duration::ZERO);
        match self.next_frame() {
            Ok(frame) => Ok(Some(frame)),
            Err(CanError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<ReceivedFrame, CanError> {
        (**self).next_frame()
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        (**self).set_receive_timeout(timeout)
    }

    fn try_next_frame(&mut self) -> Result<Option<ReceivedFrame>, CanError> {
        (**self).try_next_frame()
    }
}
