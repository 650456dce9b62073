//! Linux SocketCAN 传输
//!
//! 直接在原始 CAN 套接字上收发字节级帧。
//!
//! - 发送：帧文本先解析为 [`CommandFrame`]，再转为 `CanFrame` 写出
//! - 接收：过滤错误帧，只返回数据帧（RX）
//! - 回显：关闭内核回环（`CAN_RAW_LOOPBACK=0`），已发送的帧在本地
//!   排队并以 TX 方向返回，避免同一帧既以 TX 又以 RX 出现

use crate::{
    CanDeviceError, CanDeviceErrorKind, CanError, CommandFrame, FrameSink, FrameSource,
    MAX_PENDING_ECHOES, RawFrame, ReceivedFrame,
};
use socketcan::{
    CanError as SocketCanError, CanErrorFrame, CanFrame, CanSocket, EmbeddedFrame, ExtendedId,
    Frame, Socket, StandardId,
};
use std::collections::VecDeque;
use std::os::unix::io::AsRawFd;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{trace, warn};

mod interface_check;

pub use interface_check::check_interface_status;

/// 默认读超时（保证读取线程能及时检查退出标志）
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// SocketCAN 传输
pub struct SocketCanTransport {
    socket: CanSocket,
    interface: String,
    read_timeout: Duration,
    pending_echoes: VecDeque<RawFrame>,
}

impl SocketCanTransport {
    /// 打开接口
    ///
    /// # 错误
    /// - `CanError::Device(NotFound)`: 接口不存在
    /// - `CanError::Device(NotUp)`: 接口存在但未启动
    /// - `CanError::Io`: 套接字操作失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        if !check_interface_status(&interface)? {
            return Err(CanDeviceError::new(
                CanDeviceErrorKind::NotUp,
                format!(
                    "CAN interface '{}' is down. Bring it up with:\n  sudo ip link set up {}",
                    interface, interface
                ),
            )
            .into());
        }

        let socket = CanSocket::open(&interface).map_err(|e| {
            CanDeviceError::new(
                CanDeviceErrorKind::Backend,
                format!("Failed to open CAN interface '{}': {}", interface, e),
            )
        })?;

        let loopback_enabled: libc::c_int = 0;
        let loopback_result = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_CAN_RAW,
                libc::CAN_RAW_LOOPBACK,
                &loopback_enabled as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if loopback_result < 0 {
            // 回环未关闭时，本机发出的帧会再以 RX 出现
            warn!(
                "Failed to disable CAN_RAW_LOOPBACK on '{}': {}",
                interface,
                std::io::Error::last_os_error()
            );
        } else {
            trace!("SocketCAN interface '{}' loopback disabled", interface);
        }

        socket.set_read_timeout(DEFAULT_READ_TIMEOUT).map_err(CanError::Io)?;

        Ok(Self {
            socket,
            interface,
            read_timeout: DEFAULT_READ_TIMEOUT,
            pending_echoes: VecDeque::new(),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 设置读超时；`Duration::ZERO` 表示非阻塞
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        if timeout.is_zero() {
            self.socket.set_nonblocking(true).map_err(CanError::Io)?;
        } else {
            self.socket.set_nonblocking(false).map_err(CanError::Io)?;
            self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        }
        self.read_timeout = timeout;
        Ok(())
    }

    /// 发送字节级帧
    pub fn send_raw(&mut self, frame: &RawFrame) -> Result<(), CanError> {
        let data = frame.data_slice();
        let can_frame = if frame.is_extended {
            ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, data))
        } else {
            u16::try_from(frame.id)
                .ok()
                .and_then(StandardId::new)
                .and_then(|id| CanFrame::new(id, data))
        }
        .ok_or_else(|| {
            CanDeviceError::new(
                CanDeviceErrorKind::InvalidFrame,
                format!("Failed to create frame with ID 0x{:X}", frame.id),
            )
        })?;

        self.socket.write_frame(&can_frame).map_err(CanError::Io)?;
        trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);

        if self.pending_echoes.len() == MAX_PENDING_ECHOES {
            self.pending_echoes.pop_front();
        }
        self.pending_echoes.push_back(RawFrame {
            timestamp_us: now_us(),
            ..*frame
        });
        Ok(())
    }

    fn receive_data_frame(&mut self) -> Result<RawFrame, CanError> {
        loop {
            let can_frame = self.socket.read_frame().map_err(|e| match e.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => CanError::Timeout,
                _ => CanError::Io(e),
            })?;

            if can_frame.is_error_frame() {
                if let Ok(error_frame) = CanErrorFrame::try_from(can_frame) {
                    match SocketCanError::from(error_frame) {
                        SocketCanError::BusOff => {
                            return Err(CanDeviceError::new(
                                CanDeviceErrorKind::NotUp,
                                format!("CAN bus off on '{}'", self.interface),
                            )
                            .into());
                        },
                        other => warn!("CAN error frame on '{}': {}, ignoring", self.interface, other),
                    }
                }
                continue;
            }

            return Ok(raw_frame_from(&can_frame));
        }
    }
}

fn raw_frame_from(can_frame: &CanFrame) -> RawFrame {
    let data = can_frame.data();
    let len = data.len().min(8);
    if can_frame.is_extended() {
        RawFrame::new_extended(can_frame.raw_id() & libc::CAN_EFF_MASK, &data[..len])
    } else {
        RawFrame::new_standard((can_frame.raw_id() & libc::CAN_SFF_MASK) as u16, &data[..len])
    }
    .with_timestamp(now_us())
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

impl FrameSink for SocketCanTransport {
    fn send(&mut self, frame_text: &str) -> Result<(), CanError> {
        let frame: CommandFrame = frame_text.parse()?;
        self.send_raw(&frame.to_raw_frame())
    }

    fn send_frame(&mut self, frame: &CommandFrame) -> Result<(), CanError> {
        self.send_raw(&frame.to_raw_frame())
    }
}

impl FrameSource for SocketCanTransport {
    /// 先返回待回显的 TX 帧，再从总线读取 RX 帧
    fn next_frame(&mut self) -> Result<ReceivedFrame, CanError> {
        if let Some(frame) = self.pending_echoes.pop_front() {
            return Ok(ReceivedFrame::tx(frame));
        }
        self.receive_data_frame().map(ReceivedFrame::rx)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn vcan0_available() -> bool {
        Command::new("ip")
            .args(["link", "show", "vcan0"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_raw_frame_from_standard() {
        let id = StandardId::new(0x100).unwrap();
        let can_frame = CanFrame::new(id, &[0xFF, 0xFF, 0xFF, 0xFB]).unwrap();
        let raw = raw_frame_from(&can_frame);
        assert_eq!(raw.id, 0x100);
        assert!(!raw.is_extended);
        assert_eq!(raw.data_slice(), &[0xFF, 0xFF, 0xFF, 0xFB]);
    }

    #[test]
    fn test_raw_frame_from_extended() {
        let id = ExtendedId::new(0x1ABC_DEF0).unwrap();
        let can_frame = CanFrame::new(id, &[1]).unwrap();
        let raw = raw_frame_from(&can_frame);
        assert_eq!(raw.id, 0x1ABC_DEF0);
        assert!(raw.is_extended);
    }

    #[test]
    fn test_missing_interface_is_fatal() {
        match SocketCanTransport::new("tgdnone9") {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("interface should not exist"),
        }
    }

    #[test]
    fn test_send_echoes_tx() {
        if !vcan0_available() {
            eprintln!("vcan0 not available, skipping");
            return;
        }
        let mut transport = SocketCanTransport::new("vcan0").unwrap();
        transport.send("100#00.00.00.05.00.00.00.00").unwrap();

        let echoed = transport.next_frame().unwrap();
        assert_eq!(echoed.direction, crate::FrameDirection::Tx);
        assert_eq!(echoed.frame.id, 0x100);
        assert_eq!(echoed.frame.data_slice(), &[0, 0, 0, 5, 0, 0, 0, 0]);

        // 回环已关闭，不会再以 RX 收到
        transport.set_receive_timeout(Duration::from_millis(10));
        assert!(matches!(transport.next_frame(), Err(CanError::Timeout)));
    }

    #[test]
    fn test_send_rejects_malformed_text() {
        if !vcan0_available() {
            eprintln!("vcan0 not available, skipping");
            return;
        }
        let mut transport = SocketCanTransport::new("vcan0").unwrap();
        assert!(matches!(transport.send("100"), Err(CanError::Protocol(_))));
    }
}
