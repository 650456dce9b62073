//! 控制会话
//!
//! 一个会话独占一份运动模式状态和控制参数，并持有出站传输。
//! 所有操作都是同步的：提交参数 → 构建指令帧 → 即发即弃地发送。
//!
//! ```rust,no_run
//! use tgdrive_can::CansendTransport;
//! use tgdrive_client::ControlSession;
//! use tgdrive_protocol::{Direction, MotionMode, ParamField, ParameterInput};
//!
//! # fn main() -> Result<(), tgdrive_client::ClientError> {
//! let mut session = ControlSession::new(CansendTransport::new("can0"));
//! session.select_mode(MotionMode::ContinualSpeed);
//!
//! let input = ParameterInput::new().with(ParamField::Speed, "5");
//! let outcome = session.start(Direction::Minus, &input)?;
//! assert_eq!(outcome.frame.to_string(), "100#FF.FF.FF.FB.00.00.00.00");
//!
//! session.stop()?;
//! # Ok(())
//! # }
//! ```

use crate::ClientError;
use tgdrive_can::FrameSink;
use tgdrive_protocol::{
    CommandFrame, CommitReport, ControlParameters, Direction, FieldSet, ModeState, MotionMode,
    ParamField, ParameterInput, build_command,
};
use tracing::{debug, info, warn};

/// 一次启动/停止操作的结果
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// 已发送的指令帧
    pub frame: CommandFrame,
    /// 发送前的参数提交结果（字段错误不阻止发送）
    pub report: CommitReport,
}

/// 伺服控制会话
pub struct ControlSession<S: FrameSink> {
    sink: S,
    state: ModeState,
    params: ControlParameters,
    frames_sent: u64,
}

impl<S: FrameSink> ControlSession<S> {
    /// 以默认模式（Jog）创建会话
    pub fn new(sink: S) -> Self {
        Self::with_mode(sink, MotionMode::default())
    }

    pub fn with_mode(sink: S, mode: MotionMode) -> Self {
        Self {
            sink,
            state: ModeState::new(mode),
            params: ControlParameters::default(),
            frames_sent: 0,
        }
    }

    /// 切换运动模式，返回新模式下有效的可选字段
    pub fn select_mode(&mut self, mode: MotionMode) -> FieldSet {
        let previous = self.state.mode();
        let active = self.state.enter(mode);
        if previous != mode {
            info!("Motion mode: {} -> {}", previous, mode);
        }
        debug!(
            "Active fields: [{}]",
            active.iter().map(ParamField::name).collect::<Vec<_>>().join(", ")
        );
        active
    }

    pub fn mode(&self) -> MotionMode {
        self.state.mode()
    }

    /// 当前模式下有效的可选字段
    pub fn active_fields(&self) -> FieldSet {
        self.state.active_fields()
    }

    pub fn is_active(&self, field: ParamField) -> bool {
        self.state.is_active(field)
    }

    /// 已提交的控制参数
    pub fn parameters(&self) -> &ControlParameters {
        &self.params
    }

    /// 提交输入文本（部分提交：失败字段保留原值）
    pub fn commit(&mut self, input: &ParameterInput) -> CommitReport {
        let report = self.params.commit(input);

        for field in &report.committed {
            debug!("Committed {} = {}", field, self.params.value(*field));
        }
        for error in &report.errors {
            warn!("{}", error);
        }
        report
    }

    /// 提交参数后按方向构建并发送指令帧
    ///
    /// 字段错误只记录在 [`SendOutcome::report`] 中，仍使用该字段的原值发送。
    ///
    /// # 错误
    /// - `ClientError::Protocol(UnsupportedMode)`: 当前模式没有帧构建规则（不发送）
    /// - `ClientError::Can`: 传输失败
    pub fn start(
        &mut self,
        direction: Direction,
        input: &ParameterInput,
    ) -> Result<SendOutcome, ClientError> {
        let report = self.commit(input);
        let frame = build_command(self.state.mode(), direction, &self.params)?;
        self.send(&frame)?;
        Ok(SendOutcome { frame, report })
    }

    /// 发送当前模式的停止帧
    pub fn stop(&mut self) -> Result<CommandFrame, ClientError> {
        let frame = build_command(self.state.mode(), Direction::Stop, &self.params)?;
        self.send(&frame)?;
        Ok(frame)
    }

    fn send(&mut self, frame: &CommandFrame) -> Result<(), ClientError> {
        self.sink.send(&frame.to_string())?;
        self.frames_sent += 1;
        info!("Sent {}", frame);
        Ok(())
    }

    /// 已发送的帧数
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tgdrive_can::CanError;
    use tgdrive_protocol::ProtocolError;

    /// 记录发送文本的最小传输
    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<String>,
        fail: bool,
    }

    impl FrameSink for RecordingSink {
        fn send(&mut self, frame_text: &str) -> Result<(), CanError> {
            if self.fail {
                return Err(CanError::Disconnected);
            }
            self.sent.push(frame_text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_default_mode_is_jog() {
        let session = ControlSession::new(RecordingSink::default());
        assert_eq!(session.mode(), MotionMode::Jog);
        assert!(session.active_fields().is_empty());
    }

    #[test]
    fn test_select_mode_updates_fields() {
        let mut session = ControlSession::new(RecordingSink::default());
        let active = session.select_mode(MotionMode::PositionCycling);
        assert!(active.contains(ParamField::Position2));
        assert!(session.is_active(ParamField::Delay));
        assert!(!session.is_active(ParamField::Time));
        // 非可选字段始终有效
        assert!(session.is_active(ParamField::Speed));
    }

    #[test]
    fn test_start_plus_sends_frame() {
        let mut session =
            ControlSession::with_mode(RecordingSink::default(), MotionMode::ContinualSpeed);
        let input = ParameterInput::new().with(ParamField::Speed, "5");

        let outcome = session.start(Direction::Plus, &input).unwrap();

        assert!(outcome.report.is_clean());
        assert_eq!(session.sink().sent, vec!["100#00.00.00.05.00.00.00.00"]);
        assert_eq!(session.frames_sent(), 1);
    }

    #[test]
    fn test_unsupported_mode_sends_nothing() {
        let mut session = ControlSession::new(RecordingSink::default());
        let err = session.stop().unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::UnsupportedMode(MotionMode::Jog))
        ));
        assert!(session.sink().sent.is_empty());
        assert_eq!(session.frames_sent(), 0);
    }

    #[test]
    fn test_transport_failure_propagates() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut session = ControlSession::with_mode(sink, MotionMode::ContinualSpeed);
        assert!(matches!(
            session.stop(),
            Err(ClientError::Can(CanError::Disconnected))
        ));
        assert_eq!(session.frames_sent(), 0);
    }
}
