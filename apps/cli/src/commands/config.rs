//! 配置管理命令
//!
//! 读写 `<config_dir>/tgdrive/config.toml`

use crate::utils::resolve_config_path;
use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;
use tgdrive_client::{SessionConfig, TransportKind};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 配置键（interface, transport, cansend_program, queue_capacity, default_mode）
        key: String,

        /// 新值
        value: String,
    },

    /// 获取配置项
    Get {
        /// 配置键
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let path = resolve_config_path(config_path)?;
        let mut config = SessionConfig::load(&path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;

        match self {
            ConfigCommand::Set { key, value } => {
                config.set(&key, &value)?;
                config
                    .save(&path)
                    .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
                println!("✅ {} = {}", key, config.get(&key)?);
            },

            ConfigCommand::Get { key } => {
                if key == "all" {
                    print_config(&config);
                } else {
                    println!("{}", config.get(&key)?);
                }
            },

            ConfigCommand::Check => {
                println!("配置文件: {}", path.display());
                if !path.exists() {
                    println!("  (不存在，使用默认值)");
                }
                print_config(&config);
                check_transport(&config)?;
                println!("✅ 配置有效");
            },
        }

        Ok(())
    }
}

fn print_config(config: &SessionConfig) {
    for key in SessionConfig::KEYS {
        if let Ok(value) = config.get(key) {
            println!("  {} = {}", key, value);
        }
    }
}

#[cfg(target_os = "linux")]
fn check_transport(config: &SessionConfig) -> Result<()> {
    use tgdrive_can::socketcan::check_interface_status;

    match check_interface_status(&config.interface) {
        Ok(true) => println!("  接口 {} 已启动", config.interface),
        Ok(false) => println!("⚠️  接口 {} 未启动", config.interface),
        Err(e) if config.transport == TransportKind::Socketcan => return Err(e.into()),
        Err(e) => println!("⚠️  {}", e),
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn check_transport(config: &SessionConfig) -> Result<()> {
    if config.transport == TransportKind::Socketcan {
        anyhow::bail!("socketcan 传输仅在 Linux 上可用");
    }
    Ok(())
}
