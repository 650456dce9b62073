//! 会话配置（TOML）
//!
//! ```toml
//! interface = "can0"
//! transport = "cansend"
//! cansend_program = "cansend"
//! queue_capacity = 1024
//! default_mode = "continual_speed"
//! ```
//!
//! 缺失的键取默认值；文件不存在时整体取默认值。

use crate::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tgdrive_can::cansend::DEFAULT_CANSEND_PROGRAM;
use tgdrive_can::queue::DEFAULT_QUEUE_CAPACITY;
use tgdrive_protocol::MotionMode;
use tracing::debug;

/// 默认 CAN 接口
pub const DEFAULT_INTERFACE: &str = "can0";

/// 出站传输类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// 调用 `cansend` 进程
    #[default]
    Cansend,
    /// Linux SocketCAN 原始套接字
    Socketcan,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Cansend => "cansend",
            TransportKind::Socketcan => "socketcan",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cansend" => Ok(TransportKind::Cansend),
            "socketcan" => Ok(TransportKind::Socketcan),
            other => Err(ClientError::InvalidConfig {
                key: "transport".to_string(),
                message: format!("unknown transport '{}' (expected cansend or socketcan)", other),
            }),
        }
    }
}

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// CAN 接口名称
    pub interface: String,
    pub transport: TransportKind,
    /// `cansend` 程序名或路径
    pub cansend_program: String,
    /// 入站队列容量（帧）
    pub queue_capacity: usize,
    /// 会话启动时的运动模式
    pub default_mode: MotionMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            transport: TransportKind::default(),
            cansend_program: DEFAULT_CANSEND_PROGRAM.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            // 唯一定义了线上编码的模式
            default_mode: MotionMode::ContinualSpeed,
        }
    }
}

impl SessionConfig {
    /// 配置键（供 `config get/set` 使用）
    pub const KEYS: [&'static str; 5] = [
        "interface",
        "transport",
        "cansend_program",
        "queue_capacity",
        "default_mode",
    ];

    /// 从 TOML 文本解析并校验
    pub fn from_toml(text: &str) -> Result<Self, ClientError> {
        let config: SessionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ClientError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 加载配置文件；文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ClientError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// 保存配置文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> Result<(), ClientError> {
        self.validate()?;
        let io_err = |source| ClientError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_toml()?).map_err(io_err)?;
        debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// 校验取值
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.interface.trim().is_empty() {
            return Err(invalid("interface", "must not be empty"));
        }
        if self.cansend_program.trim().is_empty() {
            return Err(invalid("cansend_program", "must not be empty"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// 按键读取（文本形式）
    pub fn get(&self, key: &str) -> Result<String, ClientError> {
        Ok(match key {
            "interface" => self.interface.clone(),
            "transport" => self.transport.to_string(),
            "cansend_program" => self.cansend_program.clone(),
            "queue_capacity" => self.queue_capacity.to_string(),
            "default_mode" => self.default_mode.to_string(),
            _ => return Err(unknown_key(key)),
        })
    }

    /// 按键写入（文本形式）；校验失败时保持原配置不变
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut updated = self.clone();
        match key {
            "interface" => updated.interface = value.trim().to_string(),
            "transport" => updated.transport = value.parse()?,
            "cansend_program" => updated.cansend_program = value.trim().to_string(),
            "queue_capacity" => {
                updated.queue_capacity = value
                    .trim()
                    .parse()
                    .map_err(|e| invalid("queue_capacity", &format!("{}", e)))?
            },
            "default_mode" => {
                updated.default_mode = value
                    .parse()
                    .map_err(|e| invalid("default_mode", &format!("{}", e)))?
            },
            _ => return Err(unknown_key(key)),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> ClientError {
    ClientError::InvalidConfig {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn unknown_key(key: &str) -> ClientError {
    invalid(
        key,
        &format!("unknown key (expected one of: {})", SessionConfig::KEYS.join(", ")),
    )
}
