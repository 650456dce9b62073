//! 点分八位组编码的属性测试
//!
//! 使用 proptest 验证编码/解码性质。

use proptest::prelude::*;
use tgdrive_protocol::{
    CommandFrame, ControlParameters, Direction, MotionMode, PdoSpeedCommand, build_command,
    decode_u32, encode_u32, try_encode_u32,
};

proptest! {
    /// 测试任意 u32 的编码/解码往返
    #[test]
    fn encode_decode_roundtrip(value in any::<u32>()) {
        prop_assert_eq!(decode_u32(&encode_u32(value)).unwrap(), value);
    }

    /// 测试编码文本的固定格式（11 个字符，3 个分隔符，大写）
    #[test]
    fn encoded_shape(value in any::<u32>()) {
        let text = encode_u32(value);
        prop_assert_eq!(text.len(), 11);
        prop_assert_eq!(text.matches('.').count(), 3);
        prop_assert_eq!(text.to_ascii_uppercase(), text);
    }

    /// 测试超出范围的整数被拒绝而不是截断
    #[test]
    fn out_of_range_rejected(value in prop_oneof![i64::MIN..0i64, (1i64 << 32)..i64::MAX]) {
        prop_assert!(try_encode_u32(value).is_err());
    }

    /// 测试 Plus/Minus 帧轴 1 互为相反数（模 2^32）
    #[test]
    fn plus_minus_are_negations(speed in 0u32..4_294_967_291) {
        let params = ControlParameters { speed, ..Default::default() };
        let plus = build_command(MotionMode::ContinualSpeed, Direction::Plus, &params).unwrap();
        let minus = build_command(MotionMode::ContinualSpeed, Direction::Minus, &params).unwrap();

        let plus = PdoSpeedCommand::try_from(&plus).unwrap();
        let minus = PdoSpeedCommand::try_from(&minus).unwrap();
        prop_assert_eq!(plus.axis1.wrapping_add(minus.axis1), 0);
        prop_assert_eq!(plus.axis2, 0);
        prop_assert_eq!(minus.axis2, 0);
    }

    /// 测试帧文本解析往返
    #[test]
    fn frame_text_roundtrip(axis1 in any::<u32>(), axis2 in any::<u32>()) {
        let frame = PdoSpeedCommand { axis1, axis2 }.to_frame();
        let parsed: CommandFrame = frame.to_string().parse().unwrap();
        prop_assert_eq!(parsed, frame);
    }
}

#[test]
fn known_encodings() {
    assert_eq!(encode_u32(0), "00.00.00.00");
    assert_eq!(encode_u32(4294967295), "FF.FF.FF.FF");
    assert_eq!(encode_u32(17825791), "01.10.FF.FF");
}
