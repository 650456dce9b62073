//! 运动模式状态机
//!
//! 运动模式只能通过显式选择切换（无自动转换）。进入某个模式时：
//! 1. 先停用全部可选参数字段
//! 2. 再启用该模式对应的字段集合
//!
//! 该过程幂等：重复进入同一模式得到相同的有效字段集合。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::str::FromStr;

/// 运动模式
///
/// 判别值即操作界面中模式选择器的序号（0..=5）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
#[repr(u8)]
pub enum MotionMode {
    /// 点动（默认）
    Jog = 0,
    /// 连续速度
    ContinualSpeed = 1,
    /// 相对定位
    RelativePosition = 2,
    /// 绝对定位
    AbsolutePosition = 3,
    /// 速度循环
    SpeedCycling = 4,
    /// 位置循环
    PositionCycling = 5,
}

impl MotionMode {
    /// 全部模式（按选择器顺序）
    pub const ALL: [MotionMode; 6] = [
        MotionMode::Jog,
        MotionMode::ContinualSpeed,
        MotionMode::RelativePosition,
        MotionMode::AbsolutePosition,
        MotionMode::SpeedCycling,
        MotionMode::PositionCycling,
    ];

    /// 操作界面显示名称
    pub fn label(self) -> &'static str {
        match self {
            MotionMode::Jog => "Jog",
            MotionMode::ContinualSpeed => "Continual speed",
            MotionMode::RelativePosition => "Relative positioning",
            MotionMode::AbsolutePosition => "Absolute positioning",
            MotionMode::SpeedCycling => "Speed cycling",
            MotionMode::PositionCycling => "Position cycling",
        }
    }

    /// 从选择器序号转换
    pub fn from_index(index: u8) -> Result<Self, ProtocolError> {
        Self::try_from(index).map_err(|_| ProtocolError::InvalidValue {
            field: "MotionMode".to_string(),
            value: index,
        })
    }

    /// 该模式下有效的可选参数字段
    pub fn active_fields(self) -> FieldSet {
        use ParamField::*;
        match self {
            MotionMode::Jog => FieldSet::EMPTY,
            // 速度随每次启动操作提供
            MotionMode::ContinualSpeed => FieldSet::EMPTY,
            MotionMode::RelativePosition | MotionMode::AbsolutePosition => {
                FieldSet::of(&[Position])
            },
            MotionMode::SpeedCycling => FieldSet::of(&[Time, Time2, Delay, Speed2]),
            MotionMode::PositionCycling => FieldSet::of(&[Position, Position2, Delay]),
        }
    }
}

// 不使用 `#[default]`：num_enum 会把它当作未知序号的兜底值
impl Default for MotionMode {
    fn default() -> Self {
        MotionMode::Jog
    }
}

impl fmt::Display for MotionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MotionMode {
    type Err = ProtocolError;

    /// 接受显示名称（"Continual speed"）或蛇形命名（"continual_speed"），不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let alias = match normalized.as_str() {
            "relative position" => "relative positioning",
            "absolute position" => "absolute positioning",
            other => other,
        };

        MotionMode::ALL
            .into_iter()
            .find(|mode| mode.label().to_ascii_lowercase() == alias)
            .ok_or_else(|| ProtocolError::ParseError(format!("unknown motion mode '{}'", s)))
    }
}

// ============================================================================
// 参数字段
// ============================================================================

/// 控制参数字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ParamField {
    /// 加减速度（rev/s^2）
    AccDec = 0,
    /// 速度（rev/s）
    Speed = 1,
    /// 速度 2（rev/s）
    Speed2 = 2,
    /// 位置（rev）
    Position = 3,
    /// 位置 2（rev）
    Position2 = 4,
    /// 时间（s）
    Time = 5,
    /// 时间 2（s）
    Time2 = 6,
    /// 延时（s）
    Delay = 7,
}

impl ParamField {
    /// 全部字段（按提交顺序）
    pub const ALL: [ParamField; 8] = [
        ParamField::AccDec,
        ParamField::Speed,
        ParamField::Speed2,
        ParamField::Position,
        ParamField::Position2,
        ParamField::Time,
        ParamField::Time2,
        ParamField::Delay,
    ];

    /// 随模式显示/隐藏的可选字段
    pub const OPTIONAL: [ParamField; 6] = [
        ParamField::Position,
        ParamField::Position2,
        ParamField::Time,
        ParamField::Time2,
        ParamField::Delay,
        ParamField::Speed2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamField::AccDec => "acc_dec",
            ParamField::Speed => "speed",
            ParamField::Speed2 => "speed2",
            ParamField::Position => "position",
            ParamField::Position2 => "position2",
            ParamField::Time => "time",
            ParamField::Time2 => "time2",
            ParamField::Delay => "delay",
        }
    }

    /// 物理单位
    pub fn unit(self) -> &'static str {
        match self {
            ParamField::AccDec => "rev/s^2",
            ParamField::Speed | ParamField::Speed2 => "rev/s",
            ParamField::Position | ParamField::Position2 => "rev",
            ParamField::Time | ParamField::Time2 | ParamField::Delay => "s",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamField {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ParamField::ALL
            .into_iter()
            .find(|field| field.name() == normalized)
            .ok_or_else(|| ProtocolError::ParseError(format!("unknown parameter field '{}'", s)))
    }
}

/// 参数字段集合（位图）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldSet(u8);

impl FieldSet {
    pub const EMPTY: FieldSet = FieldSet(0);

    pub fn of(fields: &[ParamField]) -> Self {
        let mut set = Self::EMPTY;
        for field in fields {
            set.insert(*field);
        }
        set
    }

    pub fn insert(&mut self, field: ParamField) {
        self.0 |= field.bit();
    }

    pub fn remove(&mut self, field: ParamField) {
        self.0 &= !field.bit();
    }

    pub fn contains(self, field: ParamField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// 按 `ParamField::ALL` 顺序迭代
    pub fn iter(self) -> impl Iterator<Item = ParamField> {
        ParamField::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

// ============================================================================
// 模式状态
// ============================================================================

/// 当前运动模式及其有效字段集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModeState {
    mode: MotionMode,
    active: FieldSet,
}

impl ModeState {
    pub fn new(mode: MotionMode) -> Self {
        let mut state = Self::default();
        state.enter(mode);
        state
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    pub fn active_fields(&self) -> FieldSet {
        self.active
    }

    /// 字段是否可编辑（非可选字段始终有效）
    pub fn is_active(&self, field: ParamField) -> bool {
        !ParamField::OPTIONAL.contains(&field) || self.active.contains(field)
    }

    /// 进入模式：清空全部可选字段，再启用该模式的字段集合
    pub fn enter(&mut self, mode: MotionMode) -> FieldSet {
        for field in ParamField::OPTIONAL {
            self.active.remove(field);
        }
        for field in mode.active_fields().iter() {
            self.active.insert(field);
        }
        self.mode = mode;
        self.active
    }
}
