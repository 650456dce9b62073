//! 入站帧监视
//!
//! - [`spawn_reader`]: 后台读取线程，把 [`FrameSource`] 的帧推入有界队列
//! - [`FrameMonitor`]: 把收到的帧转换为诊断回显行，并解码 PDO 速度帧

use crate::ClientError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tgdrive_can::{CanError, FrameDirection, FrameProducer, FrameSource, ReceivedFrame};
use tgdrive_protocol::{CommandFrame, FrameType, PdoSpeedCommand, RawFrame};
use tracing::{debug, error, trace, warn};

// ============================================================================
// 读取线程
// ============================================================================

/// 后台读取线程句柄
///
/// 丢弃句柄时请求停止并等待线程退出。
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ReaderExit>>,
}

/// 读取线程退出原因
#[derive(Debug)]
pub enum ReaderExit {
    /// 收到停止请求
    Stopped,
    /// 消费端已丢弃
    ConsumerGone,
    /// 读取源不可恢复的错误
    SourceFailed(CanError),
}

impl ReaderHandle {
    /// 请求停止（不等待）
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// 停止标志（可交给 Ctrl-C 处理器）
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// 请求停止并等待线程退出
    pub fn join(mut self) -> Result<ReaderExit, ClientError> {
        self.request_stop();
        self.join_inner()
    }

    fn join_inner(&mut self) -> Result<ReaderExit, ClientError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ClientError::ReaderThread("reader thread panicked".to_string())),
            None => Ok(ReaderExit::Stopped),
        }
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.request_stop();
        if let Err(e) = self.join_inner() {
            error!("{}", e);
        }
    }
}

/// 启动读取线程
///
/// 线程在以下情况退出：停止标志被置位、消费端被丢弃、读取源返回不可恢复错误。
/// 读超时只用于周期性检查停止标志与消费端状态。
pub fn spawn_reader<R>(source: R, producer: FrameProducer) -> Result<ReaderHandle, ClientError>
where
    R: FrameSource + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();

    let handle = thread::Builder::new()
        .name("tgdrive-reader".to_string())
        .spawn(move || reader_loop(source, producer, &thread_stop))
        .map_err(|e| ClientError::ReaderThread(e.to_string()))?;

    Ok(ReaderHandle {
        stop,
        handle: Some(handle),
    })
}

fn reader_loop<R: FrameSource>(
    mut source: R,
    producer: FrameProducer,
    stop: &AtomicBool,
) -> ReaderExit {
    debug!("Reader thread started");
    let mut reported_drops = 0;

    let exit = loop {
        if stop.load(Ordering::Acquire) {
            break ReaderExit::Stopped;
        }
        if !producer.is_consumer_alive() {
            break ReaderExit::ConsumerGone;
        }

        match source.next_frame() {
            Ok(frame) => {
                trace!("{} 0x{:X}", frame.direction, frame.frame.id);
                if !producer.push(frame) {
                    break ReaderExit::ConsumerGone;
                }
                let dropped = producer.dropped_frames();
                if dropped > reported_drops {
                    warn!("Inbound queue full, {} frames dropped so far", dropped);
                    reported_drops = dropped;
                }
            },
            Err(CanError::Timeout) => continue,
            Err(e) if e.is_fatal() => {
                error!("Reader stopped: {}", e);
                break ReaderExit::SourceFailed(e);
            },
            Err(e) => warn!("Receive error: {}", e),
        }
    };

    debug!("Reader thread exited: {:?}", exit);
    exit
}

// ============================================================================
// 回显
// ============================================================================

/// 单条诊断回显
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoLine {
    pub direction: FrameDirection,
    /// 帧文本（与发送端格式一致）
    pub text: String,
    /// PDO 速度帧解码结果
    pub speed: Option<PdoSpeedCommand>,
}

impl fmt::Display for EchoLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.text)?;
        if let Some(speed) = self.speed {
            write!(
                f,
                "  [axis1={} axis2={}]",
                speed.axis1_signed(),
                speed.axis2_signed()
            )?;
        }
        Ok(())
    }
}

/// 把入站帧转换为回显行，并统计 TX/RX 数量
#[derive(Debug, Default)]
pub struct FrameMonitor {
    tx_frames: u64,
    rx_frames: u64,
    last_speed: Option<PdoSpeedCommand>,
}

impl FrameMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 处理一帧
    pub fn observe(&mut self, received: &ReceivedFrame) -> EchoLine {
        match received.direction {
            FrameDirection::Tx => self.tx_frames += 1,
            FrameDirection::Rx => self.rx_frames += 1,
        }

        let (text, speed) = describe(&received.frame);
        if speed.is_some() {
            self.last_speed = speed;
        }

        EchoLine {
            direction: received.direction,
            text,
            speed,
        }
    }

    pub fn tx_frames(&self) -> u64 {
        self.tx_frames
    }

    pub fn rx_frames(&self) -> u64 {
        self.rx_frames
    }

    /// 最近一次观察到的 PDO 速度
    pub fn last_speed(&self) -> Option<PdoSpeedCommand> {
        self.last_speed
    }
}

fn describe(frame: &RawFrame) -> (String, Option<PdoSpeedCommand>) {
    match CommandFrame::from_raw_frame(frame) {
        Ok(command) => {
            let speed = match FrameType::from_id(command.id()) {
                FrameType::PdoSpeed => PdoSpeedCommand::try_from(&command).ok(),
                FrameType::Unknown => None,
            };
            (command.to_string(), speed)
        },
        // 非 4 字节对齐的帧按原始字节显示
        Err(_) => {
            let id = if frame.is_extended {
                format!("{:08X}", frame.id)
            } else {
                format!("{:03X}", frame.id)
            };
            let bytes = frame
                .data_slice()
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(".");
            (format!("{}#{}", id, bytes), None)
        },
    }
}
