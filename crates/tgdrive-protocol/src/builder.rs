//! 指令帧构建
//!
//! 根据运动模式、方向和已提交的控制参数构建待发送的指令帧。
//! 目前只有 `ContinualSpeed` 模式定义了线上编码，其余模式返回
//! `ProtocolError::UnsupportedMode`，不产生任何帧。

use crate::frame::CommandFrame;
use crate::ids::CAN_ID_PDO_SPD;
use crate::mode::MotionMode;
use crate::params::ControlParameters;
use crate::{ProtocolError, codec};

/// 运动方向（对应操作界面的 Start+ / Start- / Stop）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Direction {
    Plus,
    Minus,
    Stop,
}

/// PDO 速度指令 (0x100)
///
/// 两个 32 位轴速度，轴 1 在前。负速度以二进制补码（模 2^32）表示。
/// 当前为单轴控制，轴 2 始终为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdoSpeedCommand {
    pub axis1: u32,
    pub axis2: u32,
}

impl PdoSpeedCommand {
    /// 由有符号速度创建（按 2^32 取模）
    pub fn new(axis1: i64, axis2: i64) -> Self {
        Self {
            axis1: codec::wrap_u32(axis1),
            axis2: codec::wrap_u32(axis2),
        }
    }

    /// 两轴速度均为 0
    pub fn stop() -> Self {
        Self::default()
    }

    /// 轴 1 速度的有符号视图
    pub fn axis1_signed(&self) -> i32 {
        self.axis1 as i32
    }

    /// 轴 2 速度的有符号视图
    pub fn axis2_signed(&self) -> i32 {
        self.axis2 as i32
    }

    /// 转换为指令帧
    pub fn to_frame(self) -> CommandFrame {
        CommandFrame::standard_unchecked(CAN_ID_PDO_SPD, &[self.axis1, self.axis2])
    }
}

impl TryFrom<&CommandFrame> for PdoSpeedCommand {
    type Error = ProtocolError;

    fn try_from(frame: &CommandFrame) -> Result<Self, Self::Error> {
        if frame.id() != CAN_ID_PDO_SPD || frame.is_extended() {
            return Err(ProtocolError::MalformedFrame(format!(
                "frame {} is not a PDO speed command",
                frame.identifier()
            )));
        }

        match *frame.payload() {
            [axis1, axis2] => Ok(Self { axis1, axis2 }),
            _ => Err(ProtocolError::MalformedFrame(format!(
                "PDO speed command needs 2 values, got {}",
                frame.payload().len()
            ))),
        }
    }
}

/// 构建指令帧（纯函数，无副作用）
///
/// # 错误
///
/// - `UnsupportedMode`: 该模式尚无帧构建规则
///
/// `Stop` 无论参数如何都返回两轴零速度帧。
///
/// ```rust
/// use tgdrive_protocol::{ControlParameters, Direction, MotionMode, build_command};
///
/// let params = ControlParameters { speed: 5, ..Default::default() };
/// let frame = build_command(MotionMode::ContinualSpeed, Direction::Minus, &params).unwrap();
/// assert_eq!(frame.to_string(), "100#FF.FF.FF.FB.00.00.00.00");
/// ```
pub fn build_command(
    mode: MotionMode,
    direction: Direction,
    params: &ControlParameters,
) -> Result<CommandFrame, ProtocolError> {
    match mode {
        MotionMode::ContinualSpeed => Ok(continual_speed(direction, params).to_frame()),
        MotionMode::Jog
        | MotionMode::RelativePosition
        | MotionMode::AbsolutePosition
        | MotionMode::SpeedCycling
        | MotionMode::PositionCycling => Err(ProtocolError::UnsupportedMode(mode)),
    }
}

fn continual_speed(direction: Direction, params: &ControlParameters) -> PdoSpeedCommand {
    let speed = i64::from(params.speed);
    match direction {
        Direction::Plus => PdoSpeedCommand::new(speed, 0),
        Direction::Minus => PdoSpeedCommand::new(-speed, 0),
        Direction::Stop => PdoSpeedCommand::stop(),
    }
}
