//! 控制参数及逐字段校验
//!
//! 提交（commit）采用"尽力而为的部分提交"策略：
//! 某个字段解析失败时，仅报告该字段的错误并保留其上一次提交的值，
//! 其余字段照常提交，不提前中止。

use crate::mode::ParamField;
use std::ops::RangeInclusive;
use thiserror::Error;

/// 固件保留的速度值（不可下发）
pub const SPEED_RESERVED: RangeInclusive<u32> = 4_294_967_291..=4_294_967_295;

/// 伺服控制参数
///
/// 每个控制会话独占一份实例，只由提交操作修改。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlParameters {
    /// 加减速度（rev/s^2）
    pub acc_dec: f64,
    /// 速度（无符号整数，保留区间除外）
    pub speed: u32,
    /// 速度 2（rev/s）
    pub speed2: f64,
    /// 位置（rev）
    pub position: f64,
    /// 位置 2（rev）
    pub position2: f64,
    /// 时间（s）
    pub time: f64,
    /// 时间 2（s）
    pub time2: f64,
    /// 延时（s）
    pub delay: f64,
}

/// 单个字段的原始文本输入
///
/// 未提供文本的字段在提交时被跳过。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterInput {
    raw: [Option<String>; 8],
}

impl ParameterInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置字段文本（链式调用）
    pub fn with(mut self, field: ParamField, text: impl Into<String>) -> Self {
        self.set(field, text);
        self
    }

    pub fn set(&mut self, field: ParamField, text: impl Into<String>) {
        self.raw[field as usize] = Some(text.into());
    }

    pub fn get(&self, field: ParamField) -> Option<&str> {
        self.raw[field as usize].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.iter().all(Option::is_none)
    }
}

/// 字段解析失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldParseReason {
    #[error("not a number")]
    NotANumber,

    #[error("not a finite number")]
    NotFinite,

    #[error("not an integer")]
    NotAnInteger,

    #[error("must not be negative")]
    Negative,

    #[error("exceeds {max}")]
    OutOfRange { max: u32 },

    #[error("{value} is reserved by the firmware")]
    Reserved { value: u32 },
}

/// 单个字段的校验错误（局部恢复，不中止提交）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid input for {field}: '{input}' ({reason})")]
pub struct FieldParseError {
    pub field: ParamField,
    pub input: String,
    pub reason: FieldParseReason,
}

/// 一次提交的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// 成功提交的字段（按提交顺序）
    pub committed: Vec<ParamField>,
    /// 解析失败的字段
    pub errors: Vec<FieldParseError>,
}

impl CommitReport {
    /// 是否没有任何字段错误
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, field: ParamField) -> Option<&FieldParseError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

impl ControlParameters {
    /// 提交输入文本（部分提交语义）
    pub fn commit(&mut self, input: &ParameterInput) -> CommitReport {
        let mut report = CommitReport::default();

        for field in ParamField::ALL {
            let Some(text) = input.get(field) else {
                continue;
            };

            let result = match field {
                ParamField::Speed => parse_speed(text).map(|v| self.speed = v),
                _ => parse_float(text).map(|v| {
                    if let Some(slot) = self.float_mut(field) {
                        *slot = v;
                    }
                }),
            };

            match result {
                Ok(()) => report.committed.push(field),
                Err(reason) => report.errors.push(FieldParseError {
                    field,
                    input: text.to_string(),
                    reason,
                }),
            }
        }

        report
    }

    /// 以 f64 读取字段值
    pub fn value(&self, field: ParamField) -> f64 {
        match field {
            ParamField::AccDec => self.acc_dec,
            ParamField::Speed => self.speed as f64,
            ParamField::Speed2 => self.speed2,
            ParamField::Position => self.position,
            ParamField::Position2 => self.position2,
            ParamField::Time => self.time,
            ParamField::Time2 => self.time2,
            ParamField::Delay => self.delay,
        }
    }

    // speed 为整数字段，返回 None
    fn float_mut(&mut self, field: ParamField) -> Option<&mut f64> {
        match field {
            ParamField::AccDec => Some(&mut self.acc_dec),
            ParamField::Speed => None,
            ParamField::Speed2 => Some(&mut self.speed2),
            ParamField::Position => Some(&mut self.position),
            ParamField::Position2 => Some(&mut self.position2),
            ParamField::Time => Some(&mut self.time),
            ParamField::Time2 => Some(&mut self.time2),
            ParamField::Delay => Some(&mut self.delay),
        }
    }
}

/// 解析浮点字段（拒绝 NaN/无穷大）
pub fn parse_float(text: &str) -> Result<f64, FieldParseReason> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| FieldParseReason::NotANumber)?;
    if !value.is_finite() {
        return Err(FieldParseReason::NotFinite);
    }
    Ok(value)
}

/// 解析速度字段：`[0, 4294967295]` 内的非负整数，且不在保留区间内
pub fn parse_speed(text: &str) -> Result<u32, FieldParseReason> {
    let text = text.trim();
    let digits = text.strip_prefix('+').unwrap_or(text);
    if is_decimal_digits(digits) {
        let value = digits
            .parse::<u64>()
            .ok()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or(FieldParseReason::OutOfRange { max: u32::MAX })?;
        return validate_speed(value);
    }
    if text.strip_prefix('-').is_some_and(is_decimal_digits) {
        return Err(FieldParseReason::Negative);
    }

    match text.parse::<f64>() {
        Ok(f) if !f.is_finite() => Err(FieldParseReason::NotFinite),
        Ok(f) if f < 0.0 => Err(FieldParseReason::Negative),
        Ok(_) => Err(FieldParseReason::NotAnInteger),
        Err(_) => Err(FieldParseReason::NotANumber),
    }
}

fn is_decimal_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// 校验速度是否可下发
pub fn validate_speed(value: u32) -> Result<u32, FieldParseReason> {
    if SPEED_RESERVED.contains(&value) {
        return Err(FieldParseReason::Reserved { value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParamField::*;

    #[test]
    fn test_defaults_are_zero() {
        let params = ControlParameters::default();
        for field in ParamField::ALL {
            assert_eq!(params.value(field), 0.0);
        }
    }

    #[test]
    fn test_partial_commit_keeps_prior_speed() {
        let mut params = ControlParameters {
            speed: 42,
            ..Default::default()
        };
        let input = ParameterInput::new().with(Speed, "abc").with(AccDec, "10.5");

        let report = params.commit(&input);

        assert_eq!(params.acc_dec, 10.5);
        assert_eq!(params.speed, 42);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, Speed);
        assert_eq!(report.errors[0].reason, FieldParseReason::NotANumber);
        assert_eq!(report.committed, vec![AccDec]);
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let mut params = ControlParameters {
            delay: 1.5,
            ..Default::default()
        };
        let report = params.commit(&ParameterInput::new());
        assert!(report.is_clean());
        assert!(report.committed.is_empty());
        assert_eq!(params.delay, 1.5);
    }

    #[test]
    fn test_all_fields_commit() {
        let mut params = ControlParameters::default();
        let input = ParameterInput::new()
            .with(AccDec, "1.000")
            .with(Speed, "250")
            .with(Speed2, "2.5")
            .with(Position, "-3.25")
            .with(Position2, "4")
            .with(Time, "0.5")
            .with(Time2, " 0.75 ")
            .with(Delay, "1e-1");

        let report = params.commit(&input);

        assert!(report.is_clean(), "{:?}", report.errors);
        assert_eq!(report.committed.len(), 8);
        assert_eq!(params.speed, 250);
        assert_eq!(params.position, -3.25);
        assert_eq!(params.time2, 0.75);
        assert_eq!(params.delay, 0.1);
    }

    #[test]
    fn test_errors_do_not_abort_remaining_fields() {
        let mut params = ControlParameters::default();
        let input = ParameterInput::new()
            .with(AccDec, "x")
            .with(Position, "NaN")
            .with(Delay, "2");

        let report = params.commit(&input);

        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.error_for(Position).unwrap().reason, FieldParseReason::NotFinite);
        assert_eq!(params.delay, 2.0);
    }

    #[test]
    fn test_speed_reserved_tail() {
        assert_eq!(
            parse_speed("4294967293"),
            Err(FieldParseReason::Reserved { value: 4294967293 })
        );
        for value in SPEED_RESERVED {
            assert!(validate_speed(value).is_err());
        }
        assert_eq!(parse_speed("4294967290"), Ok(4294967290));
        assert_eq!(parse_speed("0"), Ok(0));
        assert_eq!(parse_speed(" +7 "), Ok(7));
    }

    #[test]
    fn test_speed_rejects_non_integers() {
        assert_eq!(parse_speed("1.5"), Err(FieldParseReason::NotAnInteger));
        assert_eq!(parse_speed("-5"), Err(FieldParseReason::Negative));
        assert_eq!(
            parse_speed("4294967296"),
            Err(FieldParseReason::OutOfRange { max: u32::MAX })
        );
        assert_eq!(
            parse_speed("99999999999999999999999"),
            Err(FieldParseReason::OutOfRange { max: u32::MAX })
        );
        assert_eq!(parse_speed("-2.5"), Err(FieldParseReason::Negative));
        assert_eq!(parse_speed("inf"), Err(FieldParseReason::NotFinite));
        assert_eq!(parse_speed(""), Err(FieldParseReason::NotANumber));
    }

    #[test]
    fn test_field_parse_error_display() {
        let err = FieldParseError {
            field: Speed,
            input: "abc".to_string(),
            reason: FieldParseReason::NotANumber,
        };
        assert_eq!(err.to_string(), "Invalid input for speed: 'abc' (not a number)");
    }
}
