//! 入站帧队列（单生产者/单消费者，满时丢弃最旧帧）
//!
//! I/O 线程通过 [`FrameProducer`] 推入帧，控制线程通过 [`FrameConsumer`]
//! 按到达顺序读取。队列有界：满时弹出最旧的一帧再推入新帧，
//! 保证消费者看到的是最新数据，同时累计丢帧计数。
//!
//! ```rust
//! use tgdrive_can::{FrameSource, ReceivedFrame, RawFrame, frame_queue};
//!
//! let (producer, mut consumer) = frame_queue(2);
//! for id in [0x100, 0x101, 0x102] {
//!     producer.push(ReceivedFrame::rx(RawFrame::new_standard(id, &[])));
//! }
//!
//! // 最旧的 0x100 被丢弃
//! assert_eq!(producer.dropped_frames(), 1);
//! assert_eq!(consumer.next_frame().unwrap().frame.id, 0x101);
//! ```

use crate::{CanError, FrameSource, ReceivedFrame};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// 默认接收超时
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);

/// 创建容量为 `capacity` 的帧队列（`capacity` 为 0 时按 1 处理）
pub fn frame_queue(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped_frames = Arc::new(AtomicU64::new(0));
    let consumer_alive = Arc::new(AtomicBool::new(true));

    let producer = FrameProducer {
        tx,
        // 满时由生产者自己弹出最旧帧；该克隆使通道感知不到消费端断开，
        // 因此另用 consumer_alive 标志
        evict: rx.clone(),
        dropped_frames: dropped_frames.clone(),
        pushed_frames: Arc::new(AtomicU64::new(0)),
        consumer_alive: consumer_alive.clone(),
    };
    let consumer = FrameConsumer {
        rx,
        dropped_frames,
        timeout: DEFAULT_RECEIVE_TIMEOUT,
        alive: consumer_alive,
    };
    (producer, consumer)
}

/// 队列生产端（I/O 线程持有）
pub struct FrameProducer {
    tx: Sender<ReceivedFrame>,
    evict: Receiver<ReceivedFrame>,
    dropped_frames: Arc<AtomicU64>,
    pushed_frames: Arc<AtomicU64>,
    consumer_alive: Arc<AtomicBool>,
}

impl FrameProducer {
    /// 推入一帧，永不阻塞
    ///
    /// 返回 `false` 表示消费者已被丢弃，帧未入队。
    pub fn push(&self, frame: ReceivedFrame) -> bool {
        if !self.is_consumer_alive() {
            return false;
        }
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => {
                    self.pushed_frames.fetch_add(1, Ordering::Relaxed);
                    return true;
                },
                Err(TrySendError::Full(rejected)) => {
                    frame = rejected;
                    match self.evict.try_recv() {
                        Ok(oldest) => {
                            self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                            trace!("Queue full, dropped oldest frame 0x{:X}", oldest.frame.id);
                        },
                        // 消费者恰好清空了队列，直接重试
                        Err(TryRecvError::Empty) => {},
                        Err(TryRecvError::Disconnected) => return false,
                    }
                },
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    /// 因队列满而被丢弃的帧数
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// 消费端是否仍存在
    pub fn is_consumer_alive(&self) -> bool {
        self.consumer_alive.load(Ordering::Acquire)
    }

    /// 成功推入的帧数
    pub fn pushed_frames(&self) -> u64 {
        self.pushed_frames.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

/// 队列消费端（控制线程持有）
pub struct FrameConsumer {
    rx: Receiver<ReceivedFrame>,
    dropped_frames: Arc<AtomicU64>,
    timeout: Duration,
    alive: Arc<AtomicBool>,
}

impl Drop for FrameConsumer {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl FrameConsumer {
    /// 因队列满而被丢弃的帧数
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// 当前排队的帧数
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// 取出当前已排队的全部帧（不阻塞）
    pub fn drain(&self) -> Vec<ReceivedFrame> {
        self.rx.try_iter().collect()
    }
}

impl FrameSource for FrameConsumer {
    fn next_frame(&mut self) -> Result<ReceivedFrame, CanError> {
        if self.timeout.is_zero() {
            return match self.rx.try_recv() {
                Ok(frame) => Ok(frame),
                Err(TryRecvError::Empty) => Err(CanError::Timeout),
                Err(TryRecvError::Disconnected) => Err(CanError::Disconnected),
            };
        }

        match self.rx.recv_timeout(self.timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(CanError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(CanError::Disconnected),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawFrame;
    use std::thread;

    fn rx_frame(id: u16) -> ReceivedFrame {
        ReceivedFrame::rx(RawFrame::new_standard(id, &[id as u8]))
    }

    #[test]
    fn test_fifo_order() {
        let (producer, mut consumer) = frame_queue(8);
        for id in 1..=5 {
            assert!(producer.push(rx_frame(id)));
        }
        for id in 1..=5 {
            assert_eq!(consumer.next_frame().unwrap().frame.id, id as u32);
        }
        assert_eq!(producer.pushed_frames(), 5);
        assert_eq!(consumer.dropped_frames(), 0);
    }

    #[test]
    fn test_drop_oldest_when_full() {
        let (producer, consumer) = frame_queue(3);
        for id in 1..=10 {
            producer.push(rx_frame(id));
        }

        let ids: Vec<u32> = consumer.drain().iter().map(|f| f.frame.id).collect();
        assert_eq!(ids, vec![8, 9, 10]);
        assert_eq!(consumer.dropped_frames(), 7);
        assert_eq!(producer.dropped_frames(), 7);
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let (producer, consumer) = frame_queue(0);
        assert_eq!(producer.capacity(), 1);
        producer.push(rx_frame(1));
        producer.push(rx_frame(2));
        assert_eq!(consumer.drain().len(), 1);
    }

    #[test]
    fn test_timeout_when_empty() {
        let (_producer, mut consumer) = frame_queue(4);
        consumer.set_receive_timeout(Duration::from_millis(5));
        assert!(matches!(consumer.next_frame(), Err(CanError::Timeout)));
        assert!(consumer.try_next_frame().unwrap().is_none());
    }

    #[test]
    fn test_try_next_frame_leaves_source_nonblocking() {
        let (_producer, mut consumer) = frame_queue(4);
        consumer.set_receive_timeout(Duration::from_secs(5));
        assert!(consumer.try_next_frame().unwrap().is_none());

        // 超时未恢复，next_frame 立即返回
        let started = std::time::Instant::now();
        assert!(matches!(consumer.next_frame(), Err(CanError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_disconnected_after_producer_dropped() {
        let (producer, mut consumer) = frame_queue(4);
        producer.push(rx_frame(1));
        drop(producer);

        assert_eq!(consumer.next_frame().unwrap().frame.id, 1);
        assert!(matches!(consumer.next_frame(), Err(CanError::Disconnected)));
    }

    #[test]
    fn test_push_after_consumer_dropped() {
        let (producer, consumer) = frame_queue(4);
        assert!(producer.push(rx_frame(1)));
        assert!(producer.is_consumer_alive());

        drop(consumer);
        assert!(!producer.is_consumer_alive());
        for id in 2..10 {
            assert!(!producer.push(rx_frame(id)));
        }
        assert_eq!(producer.pushed_frames(), 1);
        assert_eq!(producer.dropped_frames(), 0);
    }

    #[test]
    fn test_consumer_dropped_on_other_thread() {
        let (producer, consumer) = frame_queue(2);
        thread::spawn(move || drop(consumer)).join().unwrap();
        assert!(!producer.push(rx_frame(1)));
    }

    #[test]
    fn test_cross_thread_order() {
        let (producer, mut consumer) = frame_queue(4096);
        let handle = thread::spawn(move || {
            for id in 0..1000u16 {
                producer.push(rx_frame(id % 0x7FF));
            }
        });
        handle.join().unwrap();

        consumer.set_receive_timeout(Duration::from_millis(10));
        let mut last = None;
        while let Ok(frame) = consumer.next_frame() {
            if let Some(prev) = last {
                assert!(frame.frame.id > prev);
            }
            last = Some(frame.frame.id);
        }
        assert_eq!(last, Some(999));
    }
}
