//! # TG Drives CLI
//!
//! TG Drives 伺服的命令行工具（CAN 速度点动）。
//!
//! ```bash
//! # 配置默认接口
//! tgdrive-cli config set interface can0
//!
//! # Start- 速度 5
//! tgdrive-cli speed --direction minus --speed 5
//! # => 100#FF.FF.FF.FB.00.00.00.00
//!
//! # 停止
//! tgdrive-cli speed --direction stop
//!
//! # 监视总线
//! tgdrive-cli monitor --interface can0
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod utils;

use commands::{
    ConfigCommand, DecodeCommand, EncodeCommand, FieldsCommand, MonitorCommand, SpeedCommand,
};
use utils::load_config;

/// TG Drives CLI - 伺服 CAN 指令工具
#[derive(Parser, Debug)]
#[command(name = "tgdrive-cli")]
#[command(about = "Command-line interface for TG Drives servo control over CAN", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 `<config_dir>/tgdrive/config.toml`）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 发送速度指令（Start+ / Start- / Stop）
    Speed {
        #[command(flatten)]
        args: SpeedCommand,
    },

    /// 列出运动模式的有效参数字段
    Fields {
        #[command(flatten)]
        args: FieldsCommand,
    },

    /// 监视总线上的 TX/RX 帧
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 把整数编码为点分八位组
    Encode {
        #[command(flatten)]
        args: EncodeCommand,
    },

    /// 解码点分八位组或帧文本
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tgdrive_cli=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(config_path),
        Commands::Speed { args } => args.execute(load_config(config_path)?),
        Commands::Fields { args } => args.execute(),
        Commands::Monitor { args } => args.execute(load_config(config_path)?),
        Commands::Encode { args } => args.execute(),
        Commands::Decode { args } => args.execute(),
    }
}
