//! 总线监视命令
//!
//! 后台线程读取 SocketCAN 帧，主线程打印 TX/RX 回显，Ctrl-C 退出。

use anyhow::Result;
use clap::Args;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tgdrive_can::{CanError, FrameConsumer, FrameSource};
use tgdrive_client::{FrameMonitor, SessionConfig};
use tracing::warn;

/// 监视命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// CAN 接口（覆盖配置）
    #[arg(short, long)]
    pub interface: Option<String>,

    /// 监视时长（秒），0 表示直到 Ctrl-C
    #[arg(short, long, default_value_t = 0)]
    pub duration: u64,

    /// 入站队列容量（覆盖配置）
    #[arg(short, long)]
    pub queue_capacity: Option<usize>,
}

impl MonitorCommand {
    #[cfg(target_os = "linux")]
    pub fn execute(&self, mut config: SessionConfig) -> Result<()> {
        use tgdrive_can::{SocketCanTransport, frame_queue};
        use tgdrive_client::spawn_reader;

        if let Some(interface) = &self.interface {
            config.set("interface", interface)?;
        }
        if let Some(capacity) = self.queue_capacity {
            config.set("queue_capacity", &capacity.to_string())?;
        }

        let transport = SocketCanTransport::new(config.interface.clone())?;
        let (producer, consumer) = frame_queue(config.queue_capacity);
        let reader = spawn_reader(transport, producer)?;

        let running = Arc::new(AtomicBool::new(true));
        let handler_running = running.clone();
        let reader_stop = reader.stop_flag();
        ctrlc::set_handler(move || {
            handler_running.store(false, Ordering::Release);
            reader_stop.store(true, Ordering::Release);
        })?;

        println!("📡 监视 {}（Ctrl-C 退出）", config.interface);
        let mut monitor = FrameMonitor::new();
        let dropped = self.pump(consumer, &mut monitor, &running)?;

        let exit = reader.join()?;
        println!(
            "\n已接收 TX {} / RX {} 帧，丢弃 {} 帧（{:?}）",
            monitor.tx_frames(),
            monitor.rx_frames(),
            dropped,
            exit
        );
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn execute(&self, _config: SessionConfig) -> Result<()> {
        anyhow::bail!("monitor 需要 Linux SocketCAN")
    }

    /// 打印回显直到停止、超时或读取线程退出，返回丢帧数
    fn pump(
        &self,
        mut consumer: FrameConsumer,
        monitor: &mut FrameMonitor,
        running: &AtomicBool,
    ) -> Result<u64> {
        let deadline =
            (self.duration > 0).then(|| Instant::now() + Duration::from_secs(self.duration));
        consumer.set_receive_timeout(Duration::from_millis(100));

        while running.load(Ordering::Acquire) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            match consumer.next_frame() {
                Ok(frame) => println!("{}", monitor.observe(&frame)),
                Err(CanError::Timeout) => continue,
                Err(CanError::Disconnected) => break,
                Err(e) => warn!("{}", e),
            }
        }

        Ok(consumer.dropped_frames())
    }
}
