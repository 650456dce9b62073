//! 编码/解码命令
//!
//! 离线查看点分八位组编码，不访问总线。

use anyhow::{Context, Result};
use clap::Args;
use tgdrive_protocol::{
    CommandFrame, FrameType, PdoSpeedCommand, decode_payload, encode_i32_wrapping, try_encode_u32,
};

/// 编码命令参数
#[derive(Args, Debug)]
pub struct EncodeCommand {
    /// 整数值
    #[arg(allow_hyphen_values = true)]
    pub value: i64,

    /// 按 2^32 取模（负数按二进制补码编码）
    #[arg(short, long)]
    pub wrap: bool,
}

impl EncodeCommand {
    pub fn render(&self) -> Result<String> {
        if self.wrap {
            Ok(encode_i32_wrapping(self.value))
        } else {
            Ok(try_encode_u32(self.value)?)
        }
    }

    pub fn execute(&self) -> Result<()> {
        println!("{}", self.render()?);
        Ok(())
    }
}

/// 解码命令参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// 点分八位组（`AA.BB.CC.DD[...]`）或完整帧文本（`100#...`）
    pub text: String,
}

impl DecodeCommand {
    pub fn render(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();

        if self.text.contains('#') {
            let frame: CommandFrame = self.text.parse().context("无法解析帧文本")?;
            lines.push(format!(
                "id=0x{:X} ({})",
                frame.id(),
                if frame.is_extended() { "extended" } else { "standard" }
            ));
            push_values(&mut lines, frame.payload());

            if FrameType::from_id(frame.id()) == FrameType::PdoSpeed
                && let Ok(speed) = PdoSpeedCommand::try_from(&frame)
            {
                lines.push(format!(
                    "PDO speed: axis1={} axis2={}",
                    speed.axis1_signed(),
                    speed.axis2_signed()
                ));
            }
        } else {
            let values = decode_payload(&self.text).context("无法解析点分八位组")?;
            push_values(&mut lines, &values);
        }

        Ok(lines)
    }

    pub fn execute(&self) -> Result<()> {
        for line in self.render()? {
            println!("{}", line);
        }
        Ok(())
    }
}

fn push_values(lines: &mut Vec<String>, values: &[u32]) {
    for (index, value) in values.iter().enumerate() {
        lines.push(format!(
            "[{}] {} (signed {})",
            index,
            value,
            *value as i32
        ));
    }
}
