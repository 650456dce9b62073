//! 速度指令命令
//!
//! 提交参数并发送一次 Start+/Start-/Stop 指令帧（即发即弃）。

use anyhow::Result;
use clap::{Args, ValueEnum};
use tgdrive_can::{CanError, FrameSink};
use tgdrive_client::{ControlSession, SessionConfig, TransportKind, open_sink};
use tgdrive_protocol::{Direction, MotionMode, ParamField, ParameterInput};
use tracing::info;

/// 方向参数
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    Plus,
    Minus,
    Stop,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Plus => Direction::Plus,
            DirectionArg::Minus => Direction::Minus,
            DirectionArg::Stop => Direction::Stop,
        }
    }
}

/// 速度命令参数
#[derive(Args, Debug)]
pub struct SpeedCommand {
    /// 方向
    #[arg(short, long, value_enum)]
    pub direction: DirectionArg,

    /// 速度（非负整数）
    #[arg(short, long)]
    pub speed: Option<String>,

    /// 加减速度（rev/s^2）
    #[arg(short, long)]
    pub acc_dec: Option<String>,

    /// 运动模式（覆盖配置中的 default_mode）
    #[arg(short, long)]
    pub mode: Option<MotionMode>,

    /// CAN 接口（覆盖配置）
    #[arg(short, long)]
    pub interface: Option<String>,

    /// 传输类型（覆盖配置）
    #[arg(short, long)]
    pub transport: Option<String>,

    /// 只打印帧文本，不发送
    #[arg(long)]
    pub dry_run: bool,
}

/// 只打印不发送的传输
#[derive(Debug, Default)]
pub struct PrintSink {
    pub printed: Vec<String>,
}

impl FrameSink for PrintSink {
    fn send(&mut self, frame_text: &str) -> Result<(), CanError> {
        println!("{}", frame_text);
        self.printed.push(frame_text.to_string());
        Ok(())
    }
}

impl SpeedCommand {
    /// 命令行覆盖配置文件
    pub fn effective_config(&self, mut config: SessionConfig) -> Result<SessionConfig> {
        if let Some(interface) = &self.interface {
            config.set("interface", interface)?;
        }
        if let Some(transport) = &self.transport {
            config.transport = transport.parse::<TransportKind>()?;
        }
        Ok(config)
    }

    fn input(&self) -> ParameterInput {
        let mut input = ParameterInput::new();
        if let Some(speed) = &self.speed {
            input.set(ParamField::Speed, speed.as_str());
        }
        if let Some(acc_dec) = &self.acc_dec {
            input.set(ParamField::AccDec, acc_dec.as_str());
        }
        input
    }

    /// 在给定传输上执行，返回已发送的帧文本
    pub fn run_with<S: FrameSink>(&self, sink: S, mode: MotionMode) -> Result<String> {
        let mut session = ControlSession::with_mode(sink, mode);

        let frame = match Direction::from(self.direction) {
            Direction::Stop => {
                session.commit(&self.input());
                session.stop()?
            },
            direction => {
                let outcome = session.start(direction, &self.input())?;
                for error in &outcome.report.errors {
                    eprintln!("⚠️  {}", error);
                }
                outcome.frame
            },
        };

        Ok(frame.to_string())
    }

    pub fn execute(&self, config: SessionConfig) -> Result<()> {
        let mode = self.mode.unwrap_or(config.default_mode);
        if self.dry_run {
            self.run_with(PrintSink::default(), mode)?;
            return Ok(());
        }

        let config = self.effective_config(config)?;
        let sink = open_sink(&config)?;
        let text = self.run_with(sink, mode)?;
        info!("{} -> {}", text, config.interface);
        println!("✅ {} ({})", text, config.interface);
        Ok(())
    }
}
