//! CAN ID 常量定义
//!
//! 帧文本中的标识符按照 `cansend` 的约定书写（十六进制，标准帧 3 位，
//! 扩展帧 8 位），因此文本 `"100"` 对应仲裁 ID `0x100`。

/// 标准帧 ID 上限（11-bit）
pub const STANDARD_ID_MAX: u32 = 0x7FF;

/// 扩展帧 ID 上限（29-bit）
pub const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

// ============================================================================
// PDO 指令 ID 常量
// ============================================================================

/// PDO 速度指令（双轴速度，帧文本标识符为 `"100"`）
///
/// 文本 `"100"` 由传输层（`cansend`、SocketCAN）按十六进制解读，
/// 因此上总线的仲裁 ID 为 `0x100`。
pub const CAN_ID_PDO_SPD: u32 = 0x100;

// ============================================================================
// ID 分类枚举
// ============================================================================

/// CAN 帧类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// PDO 速度指令
    PdoSpeed,
    /// 未知类型
    Unknown,
}

impl FrameType {
    /// 根据 CAN ID 判断帧类型
    pub fn from_id(id: u32) -> Self {
        match id {
            CAN_ID_PDO_SPD => FrameType::PdoSpeed,
            _ => FrameType::Unknown,
        }
    }
}
