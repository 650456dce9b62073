//! 指令帧（CommandFrame）
//!
//! 帧文本格式：`"<identifier>#<AA.BB.CC.DD>[.<AA.BB.CC.DD>]"`，
//! 与接收端固件及 `cansend` 工具逐字节兼容。

use crate::codec::{OCTETS_PER_VALUE, decode_payload, encode_payload};
use crate::ids::{EXTENDED_ID_MAX, STANDARD_ID_MAX};
use crate::{ProtocolError, RawFrame};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// 标识符与载荷之间的分隔符
pub const ID_SEPARATOR: char = '#';

/// 单帧最多承载的 32 位值数量（8 字节）
pub const MAX_PAYLOAD_VALUES: usize = 2;

/// 已编码的指令帧
///
/// 在发送前构建，构建后不可修改，不做持久化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    id: u32,
    is_extended: bool,
    payload: SmallVec<[u32; MAX_PAYLOAD_VALUES]>,
}

impl CommandFrame {
    /// 创建标准帧指令
    pub fn new(id: u32, payload: &[u32]) -> Result<Self, ProtocolError> {
        Self::with_id_kind(id, false, payload)
    }

    /// 创建扩展帧指令
    pub fn new_extended(id: u32, payload: &[u32]) -> Result<Self, ProtocolError> {
        Self::with_id_kind(id, true, payload)
    }

    /// 已知合法的标准帧（ID ≤ 0x7FF，载荷 ≤ 2 个值）
    pub(crate) fn standard_unchecked(id: u32, payload: &[u32]) -> Self {
        debug_assert!(id <= STANDARD_ID_MAX && payload.len() <= MAX_PAYLOAD_VALUES);
        Self {
            id,
            is_extended: false,
            payload: SmallVec::from_slice(payload),
        }
    }

    fn with_id_kind(id: u32, is_extended: bool, payload: &[u32]) -> Result<Self, ProtocolError> {
        let max_id = if is_extended {
            EXTENDED_ID_MAX
        } else {
            STANDARD_ID_MAX
        };
        if id > max_id {
            return Err(ProtocolError::MalformedFrame(format!(
                "CAN ID 0x{:X} exceeds 0x{:X}",
                id, max_id
            )));
        }
        if payload.len() > MAX_PAYLOAD_VALUES {
            return Err(ProtocolError::MalformedFrame(format!(
                "payload of {} values exceeds {} (8 bytes)",
                payload.len(),
                MAX_PAYLOAD_VALUES
            )));
        }

        Ok(Self {
            id,
            is_extended,
            payload: SmallVec::from_slice(payload),
        })
    }

    /// 仲裁 ID
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_extended(&self) -> bool {
        self.is_extended
    }

    /// 载荷中的 32 位值（按帧内顺序）
    pub fn payload(&self) -> &[u32] {
        &self.payload
    }

    /// 标识符文本（标准帧 3 位、扩展帧 8 位大写十六进制）
    pub fn identifier(&self) -> String {
        if self.is_extended {
            format!("{:08X}", self.id)
        } else {
            format!("{:03X}", self.id)
        }
    }

    /// 载荷文本（点分八位组）
    pub fn payload_text(&self) -> String {
        encode_payload(&self.payload)
    }

    /// 转换为字节级 CAN 帧
    pub fn to_raw_frame(&self) -> RawFrame {
        let mut data: SmallVec<[u8; 8]> = SmallVec::new();
        for value in &self.payload {
            data.extend_from_slice(&value.to_be_bytes());
        }

        if self.is_extended {
            RawFrame::new_extended(self.id, &data)
        } else {
            RawFrame::new_standard(self.id as u16, &data)
        }
    }

    /// 从字节级 CAN 帧还原
    ///
    /// 数据长度必须是 4 的整数倍。
    pub fn from_raw_frame(frame: &RawFrame) -> Result<Self, ProtocolError> {
        let data = frame.data_slice();
        if data.len() % OCTETS_PER_VALUE != 0 {
            return Err(ProtocolError::MalformedFrame(format!(
                "frame 0x{:X} carries {} bytes, not a multiple of {}",
                frame.id,
                data.len(),
                OCTETS_PER_VALUE
            )));
        }

        let payload: SmallVec<[u32; MAX_PAYLOAD_VALUES]> = data
            .chunks_exact(OCTETS_PER_VALUE)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Self::with_id_kind(frame.id, frame.is_extended, &payload)
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.identifier(), ID_SEPARATOR, self.payload_text())
    }
}

impl FromStr for CommandFrame {
    type Err = ProtocolError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (id_text, payload_text) = text.split_once(ID_SEPARATOR).ok_or_else(|| {
            ProtocolError::MalformedFrame(format!("missing '{}' in '{}'", ID_SEPARATOR, text))
        })?;

        let is_extended = match id_text.len() {
            3 => false,
            8 => true,
            _ => {
                return Err(ProtocolError::MalformedFrame(format!(
                    "identifier '{}' must have 3 or 8 hex digits",
                    id_text
                )));
            },
        };
        if !id_text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProtocolError::MalformedFrame(format!(
                "identifier '{}' is not hexadecimal",
                id_text
            )));
        }
        let id = u32::from_str_radix(id_text, 16)
            .map_err(|e| ProtocolError::MalformedFrame(format!("identifier '{}': {}", id_text, e)))?;

        let payload = decode_payload(payload_text)?;
        Self::with_id_kind(id, is_extended, &payload)
    }
}
