//! 模式字段查询命令

use anyhow::Result;
use clap::Args;
use tgdrive_protocol::{ModeState, MotionMode, ParamField};

/// 查询某个运动模式下有效的参数字段
#[derive(Args, Debug)]
pub struct FieldsCommand {
    /// 运动模式（如 "continual_speed"、"Speed cycling"）；省略时列出全部模式
    pub mode: Option<MotionMode>,
}

impl FieldsCommand {
    pub fn render(&self) -> Vec<String> {
        match self.mode {
            Some(mode) => describe_mode(mode),
            None => MotionMode::ALL
                .into_iter()
                .flat_map(|mode| {
                    let mut lines = describe_mode(mode);
                    lines.push(String::new());
                    lines
                })
                .collect(),
        }
    }

    pub fn execute(&self) -> Result<()> {
        for line in self.render() {
            println!("{}", line);
        }
        Ok(())
    }
}

fn describe_mode(mode: MotionMode) -> Vec<String> {
    let state = ModeState::new(mode);
    let mut lines = vec![format!("{} ({})", mode, u8::from(mode))];
    for field in ParamField::ALL {
        if state.is_active(field) {
            lines.push(format!("  {:<10} [{}]", field.name(), field.unit()));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_cycling_fields() {
        let lines = FieldsCommand {
            mode: Some(MotionMode::SpeedCycling),
        }
        .render();
        assert_eq!(lines[0], "Speed cycling (4)");
        let names: Vec<&str> = lines[1..]
            .iter()
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(names, ["acc_dec", "speed", "speed2", "time", "time2", "delay"]);
    }

    #[test]
    fn test_jog_has_only_base_fields() {
        let lines = FieldsCommand {
            mode: Some(MotionMode::Jog),
        }
        .render();
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_all_modes_listed() {
        let lines = FieldsCommand { mode: None }.render();
        for mode in MotionMode::ALL {
            assert!(lines.iter().any(|l| l.starts_with(mode.label())));
        }
    }
}
