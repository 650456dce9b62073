//! 配置文件定位与加载

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tgdrive_client::SessionConfig;

/// 默认配置文件：`<config_dir>/tgdrive/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("tgdrive");
    path.push("config.toml");
    Ok(path)
}

/// 命令行 `--config` 优先，否则使用默认路径
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// 加载配置（文件不存在时返回默认值）
pub fn load_config(explicit: Option<&Path>) -> Result<SessionConfig> {
    let path = resolve_config_path(explicit)?;
    SessionConfig::load(&path).with_context(|| format!("加载配置失败: {}", path.display()))
}
