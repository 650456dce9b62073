//! # TG Drives Protocol
//!
//! TG Drives 伺服驱动器手动点对点 CAN 指令协议（无硬件依赖）
//!
//! ## 模块
//!
//! - `codec`: 32 位数值的点分八位组编码/解码
//! - `ids`: CAN ID 常量定义
//! - `frame`: 指令帧（`CommandFrame`）文本格式
//! - `mode`: 运动模式与有效参数字段表
//! - `params`: 控制参数及逐字段校验
//! - `builder`: 指令帧构建
//!
//! ## 字节序
//!
//! 协议使用 Motorola (MSB) 高位在前（大端字节序），每个 32 位值
//! 以 `"AA.BB.CC.DD"` 形式出现在帧文本中（AA 为最高字节）。

pub mod builder;
pub mod codec;
pub mod frame;
pub mod ids;
pub mod mode;
pub mod params;

// 重新导出常用类型
pub use builder::*;
pub use codec::*;
pub use frame::*;
pub use ids::*;
pub use mode::*;
pub use params::*;

/// CAN 2.0 标准帧的统一抽象
///
/// `RawFrame` 是协议层和硬件层之间的中间抽象：协议层只处理帧文本
/// （`CommandFrame`），SocketCAN 等字节级后端只处理 `RawFrame`，
/// 二者通过 `CommandFrame::to_raw_frame` / `CommandFrame::from_raw_frame` 转换。
///
/// # 限制
///
/// - **仅支持 CAN 2.0**：固定 8 字节数据
///
/// ```rust
/// use tgdrive_protocol::RawFrame;
///
/// let frame = RawFrame::new_standard(0x100, &[0, 0, 0, 5, 0, 0, 0, 0]);
/// assert_eq!(frame.id(), 0x100);
/// assert_eq!(frame.data_slice().len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawFrame {
    /// CAN ID（标准帧或扩展帧）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 接收时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl RawFrame {
    /// 创建标准帧
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp_us: 0,
        }
    }

    /// 附加时间戳（微秒）
    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }
}

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 数值超出 32 位无符号范围（编码时不截断、不回绕）
    #[error("Value out of range for u32: {value}")]
    OutOfRange { value: i64 },

    /// 帧文本或八位组格式错误
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// 该运动模式尚无帧构建规则
    #[error("Unsupported motion mode: {0}")]
    UnsupportedMode(MotionMode),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },
}
