//! 点分八位组编码（Dotted-octet encoding）
//!
//! 每个 32 位值编码为四个以 `.` 分隔的两位大写十六进制八位组，
//! 高位在前：`0x0110FFFF` → `"01.10.FF.FF"`。
//!
//! 多个 32 位值连续出现在同一帧载荷中时，直接以 `.` 拼接
//! （`"00.00.00.05.00.00.00.00"`）。

use crate::ProtocolError;
use smallvec::SmallVec;

/// 八位组分隔符
pub const OCTET_SEPARATOR: char = '.';

/// 每个 32 位值的八位组数量
pub const OCTETS_PER_VALUE: usize = 4;

/// 将 32 位无符号值编码为点分八位组文本
///
/// ```rust
/// use tgdrive_protocol::encode_u32;
///
/// assert_eq!(encode_u32(0), "00.00.00.00");
/// assert_eq!(encode_u32(17825791), "01.10.FF.FF");
/// ```
pub fn encode_u32(value: u32) -> String {
    value
        .to_be_bytes()
        .iter()
        .map(|byte| hex::encode_upper([*byte]))
        .collect::<Vec<_>>()
        .join(".")
}

/// 编码任意整数，超出 `[0, 2^32-1]` 时返回 `OutOfRange`
///
/// 不做截断或回绕；有意的二进制补码回绕请使用 [`encode_i32_wrapping`]。
pub fn try_encode_u32(value: i64) -> Result<String, ProtocolError> {
    let value = u32::try_from(value).map_err(|_| ProtocolError::OutOfRange { value })?;
    Ok(encode_u32(value))
}

/// 有符号值按 2^32 取模后编码（负速度使用的二进制补码表示）
pub fn encode_i32_wrapping(value: i64) -> String {
    encode_u32(wrap_u32(value))
}

/// 有符号值按 2^32 取模
pub fn wrap_u32(value: i64) -> u32 {
    value.rem_euclid(1i64 << 32) as u32
}

/// 解码点分八位组文本为 32 位无符号值
///
/// 八位组数量必须为 4，每个八位组必须恰好是两位十六进制数字（大小写均可）。
pub fn decode_u32(text: &str) -> Result<u32, ProtocolError> {
    let octets: SmallVec<[&str; OCTETS_PER_VALUE]> = text.split(OCTET_SEPARATOR).collect();
    if octets.len() != OCTETS_PER_VALUE {
        return Err(ProtocolError::MalformedFrame(format!(
            "expected {} octets, got {} in '{}'",
            OCTETS_PER_VALUE,
            octets.len(),
            text
        )));
    }

    let mut bytes = [0u8; OCTETS_PER_VALUE];
    for (byte, octet) in bytes.iter_mut().zip(&octets) {
        *byte = decode_octet(octet)?;
    }
    Ok(u32::from_be_bytes(bytes))
}

/// 编码多个 32 位值组成的载荷
pub fn encode_payload(values: &[u32]) -> String {
    values.iter().map(|v| encode_u32(*v)).collect::<Vec<_>>().join(".")
}

/// 解码载荷文本为 32 位值序列
///
/// 八位组总数必须是 4 的整数倍；空文本表示空载荷。
pub fn decode_payload(text: &str) -> Result<SmallVec<[u32; 2]>, ProtocolError> {
    if text.is_empty() {
        return Ok(SmallVec::new());
    }

    let octets: Vec<&str> = text.split(OCTET_SEPARATOR).collect();
    if octets.len() % OCTETS_PER_VALUE != 0 {
        return Err(ProtocolError::MalformedFrame(format!(
            "payload has {} octets, not a multiple of {}",
            octets.len(),
            OCTETS_PER_VALUE
        )));
    }

    octets
        .chunks(OCTETS_PER_VALUE)
        .map(|group| {
            let mut bytes = [0u8; OCTETS_PER_VALUE];
            for (byte, octet) in bytes.iter_mut().zip(group) {
                *byte = decode_octet(octet)?;
            }
            Ok(u32::from_be_bytes(bytes))
        })
        .collect()
}

fn decode_octet(octet: &str) -> Result<u8, ProtocolError> {
    if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProtocolError::MalformedFrame(format!(
            "octet '{}' is not two hex digits",
            octet
        )));
    }

    let mut byte = [0u8; 1];
    hex::decode_to_slice(octet, &mut byte)
        .map_err(|e| ProtocolError::MalformedFrame(format!("octet '{}': {}", octet, e)))?;
    Ok(byte[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_values() {
        assert_eq!(encode_u32(0), "00.00.00.00");
        assert_eq!(encode_u32(u32::MAX), "FF.FF.FF.FF");
        assert_eq!(encode_u32(17825791), "01.10.FF.FF");
        assert_eq!(encode_u32(5), "00.00.00.05");
    }

    #[test]
    fn test_encode_is_msb_first() {
        assert_eq!(encode_u32(0x1234_5678), "12.34.56.78");
    }

    #[test]
    fn test_try_encode_out_of_range() {
        assert_eq!(
            try_encode_u32(-1),
            Err(ProtocolError::OutOfRange { value: -1 })
        );
        assert_eq!(
            try_encode_u32(1 << 32),
            Err(ProtocolError::OutOfRange { value: 1 << 32 })
        );
        assert_eq!(try_encode_u32(4294967295).unwrap(), "FF.FF.FF.FF");
    }

    #[test]
    fn test_wrapping_negative() {
        assert_eq!(wrap_u32(-5), u32::MAX - 4);
        assert_eq!(encode_i32_wrapping(-5), "FF.FF.FF.FB");
        assert_eq!(encode_i32_wrapping(-(1 << 32)), "00.00.00.00");
        assert_eq!(encode_i32_wrapping(5), "00.00.00.05");
    }

    #[test]
    fn test_decode_known_values() {
        assert_eq!(decode_u32("01.10.FF.FF").unwrap(), 17825791);
        assert_eq!(decode_u32("01.10.ff.ff").unwrap(), 17825791);
        assert_eq!(decode_u32("00.00.00.00").unwrap(), 0);
    }

    #[test]
    fn test_decode_rejects_bad_octet_count() {
        assert!(matches!(
            decode_u32("00.00.00"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            decode_u32("00.00.00.00.00"),
            Err(ProtocolError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_octets() {
        for text in ["0.00.00.00", "000.00.00.00", "GG.00.00.00", "+1.00.00.00", "00..00.00", ""] {
            assert!(
                matches!(decode_u32(text), Err(ProtocolError::MalformedFrame(_))),
                "expected malformed: {:?}",
                text
            );
        }
    }

    #[test]
    fn test_payload_two_groups() {
        let text = encode_payload(&[5, 0]);
        assert_eq!(text, "00.00.00.05.00.00.00.00");
        assert_eq!(decode_payload(&text).unwrap().as_slice(), &[5, 0]);
    }

    #[test]
    fn test_payload_partial_group_rejected() {
        assert!(decode_payload("00.00.00.05.00").is_err());
        assert!(decode_payload("").unwrap().is_empty());
    }
}
