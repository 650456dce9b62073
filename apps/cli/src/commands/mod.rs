//! 命令定义和实现

pub mod codec;
pub mod config;
pub mod fields;
pub mod monitor;
pub mod speed;

pub use codec::{DecodeCommand, EncodeCommand};
pub use config::ConfigCommand;
pub use fields::FieldsCommand;
pub use monitor::MonitorCommand;
pub use speed::SpeedCommand;
