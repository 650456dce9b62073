//! `cansend` 进程传输
//!
//! 每帧启动一次 `cansend <interface> <frame_text>`，帧文本原样透传。
//! 不跟踪应答，也不重试；进程返回非零状态时报告 `CommandFailed`。

use crate::{CanError, FrameSink};
use std::process::{Command, Stdio};
use tracing::{debug, trace};

/// 默认发送程序
pub const DEFAULT_CANSEND_PROGRAM: &str = "cansend";

/// 通过 `cansend` 工具发送帧文本
#[derive(Debug, Clone)]
pub struct CansendTransport {
    program: String,
    interface: String,
    sent_count: u64,
}

impl CansendTransport {
    /// 使用默认程序名 `cansend`
    pub fn new(interface: impl Into<String>) -> Self {
        Self::with_program(DEFAULT_CANSEND_PROGRAM, interface)
    }

    /// 指定发送程序（例如绝对路径或测试替身）
    pub fn with_program(program: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            interface: interface.into(),
            sent_count: 0,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 已成功发送的帧数
    pub fn sent_count(&self) -> u64 {
        self.sent_count
    }

    /// 构建（不执行）一次发送对应的进程命令
    pub fn command_for(&self, frame_text: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(&self.interface)
            .arg(frame_text)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        command
    }
}

impl FrameSink for CansendTransport {
    fn send(&mut self, frame_text: &str) -> Result<(), CanError> {
        trace!("{} {} {}", self.program, self.interface, frame_text);

        let output = self.command_for(frame_text).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = match stderr.trim() {
                "" => output.status.to_string(),
                detail => format!("{} ({})", output.status, detail),
            };
            return Err(CanError::CommandFailed {
                program: self.program.clone(),
                status,
            });
        }

        self.sent_count += 1;
        debug!("Sent {} on {}", frame_text, self.interface);
        Ok(())
    }
}
