//! 内存传输（无硬件依赖，用于测试）
//!
//! [`MockTransport`] 同时实现 [`FrameSink`] 与 [`FrameSource`]：
//! 发送的帧文本记录到 [`MockHandle`]，并以 TX 方向回显；
//! 测试通过 `MockHandle::inject` 注入 RX 帧。

use crate::{
    CanDeviceError, CanDeviceErrorKind, CanError, CommandFrame, FrameSink, FrameSource,
    MAX_PENDING_ECHOES, RawFrame, ReceivedFrame,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 内存传输
pub struct MockTransport {
    sent: Sender<String>,
    injected: Receiver<RawFrame>,
    echoes: VecDeque<RawFrame>,
    should_fail: Arc<AtomicBool>,
    timeout: Duration,
}

/// 测试侧句柄：观察已发送帧、注入接收帧、模拟故障
#[derive(Clone)]
pub struct MockHandle {
    sent: Receiver<String>,
    injected: Sender<RawFrame>,
    should_fail: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let (sent_tx, sent_rx) = unbounded();
        let (inject_tx, inject_rx) = unbounded();
        let should_fail = Arc::new(AtomicBool::new(false));

        let transport = Self {
            sent: sent_tx,
            injected: inject_rx,
            echoes: VecDeque::new(),
            should_fail: should_fail.clone(),
            timeout: Duration::from_millis(10),
        };
        let handle = MockHandle {
            sent: sent_rx,
            injected: inject_tx,
            should_fail,
        };
        (transport, handle)
    }
}

impl MockHandle {
    /// 取出迄今发送的所有帧文本
    pub fn sent_frames(&self) -> Vec<String> {
        self.sent.try_iter().collect()
    }

    /// 注入一帧（以 RX 方向返回）
    pub fn inject(&self, frame: RawFrame) {
        let _ = self.injected.send(frame);
    }

    /// 注入一条帧文本
    pub fn inject_text(&self, frame_text: &str) -> Result<(), CanError> {
        let frame: CommandFrame = frame_text.parse()?;
        self.inject(frame.to_raw_frame());
        Ok(())
    }

    /// 之后的发送全部失败
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }
}

impl FrameSink for MockTransport {
    fn send(&mut self, frame_text: &str) -> Result<(), CanError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(CanDeviceError::new(CanDeviceErrorKind::Backend, "mock send failure").into());
        }

        let frame: CommandFrame = frame_text.parse()?;
        if self.echoes.len() == MAX_PENDING_ECHOES {
            self.echoes.pop_front();
        }
        self.echoes.push_back(frame.to_raw_frame());
        self.sent
            .send(frame_text.to_string())
            .map_err(|_| CanError::Disconnected)
    }
}

impl FrameSource for MockTransport {
    fn next_frame(&mut self) -> Result<ReceivedFrame, CanError> {
        if let Some(frame) = self.echoes.pop_front() {
            return Ok(ReceivedFrame::tx(frame));
        }

        let received = if self.timeout.is_zero() {
            self.injected.try_recv().map_err(|e| {
                if e.is_disconnected() {
                    CanError::Disconnected
                } else {
                    CanError::Timeout
                }
            })
        } else {
            self.injected.recv_timeout(self.timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => CanError::Timeout,
                RecvTimeoutError::Disconnected => CanError::Disconnected,
            })
        };
        received.map(ReceivedFrame::rx)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameDirection;

    #[test]
    fn test_records_and_echoes() {
        let (mut transport, handle) = MockTransport::new();
        transport.send("100#00.00.00.05.00.00.00.00").unwrap();

        assert_eq!(handle.sent_frames(), vec!["100#00.00.00.05.00.00.00.00"]);
        let echoed = transport.next_frame().unwrap();
        assert_eq!(echoed.direction, FrameDirection::Tx);
        assert_eq!(echoed.frame.data_slice(), &[0, 0, 0, 5, 0, 0, 0, 0]);
    }

    #[test]
    fn test_echoes_are_capped_when_only_sending() {
        let (mut transport, handle) = MockTransport::new();
        let total = MAX_PENDING_ECHOES + 10;
        for speed in 0..total {
            let text = format!("100#{}.00.00.00.00", tgdrive_protocol::encode_u32(speed as u32));
            transport.send(&text).unwrap();
        }
        assert_eq!(handle.sent_frames().len(), total);

        // 只保留最近的回显，最旧的被丢弃
        transport.set_receive_timeout(Duration::ZERO);
        let mut echoed = Vec::new();
        while let Ok(frame) = transport.next_frame() {
            echoed.push(frame.frame.data[3]);
        }
        assert_eq!(echoed.len(), MAX_PENDING_ECHOES);
        assert_eq!(echoed[0], 10);
        assert_eq!(*echoed.last().unwrap(), (total - 1) as u8);
    }

    #[test]
    fn test_injected_frames_are_rx() {
        let (mut transport, handle) = MockTransport::new();
        handle.inject_text("100#FF.FF.FF.FB.00.00.00.00").unwrap();

        let received = transport.next_frame().unwrap();
        assert_eq!(received.direction, FrameDirection::Rx);
        assert_eq!(received.frame.id, 0x100);
        assert!(matches!(transport.next_frame(), Err(CanError::Timeout)));
    }

    #[test]
    fn test_failure_injection() {
        let (mut transport, handle) = MockTransport::new();
        handle.set_should_fail(true);
        assert!(matches!(
            transport.send("100#00.00.00.00.00.00.00.00"),
            Err(CanError::Device(_))
        ));
        assert!(handle.sent_frames().is_empty());
    }

    #[test]
    fn test_disconnected_after_handle_dropped() {
        let (mut transport, handle) = MockTransport::new();
        drop(handle);
        transport.set_receive_timeout(Duration::ZERO);
        assert!(matches!(transport.next_frame(), Err(CanError::Disconnected)));
    }
}
