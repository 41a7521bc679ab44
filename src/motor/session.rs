// Motor session state machine
//
// Interprets device responses and tracks one run of the motor: the armed
// target, the device-reported progress, and the connection handshake.
// Response matching is deliberately permissive (prefix/substring, not
// exact lines) so minor firmware message variations don't break the
// session; unrecognized messages are ignored rather than rejected.

use tracing::debug;

use super::command::{CommandStrategy, MotorMode};

/// Idle/armed status shown when nothing is in flight
const STATUS_IDLE: &str = "standing by";
const STATUS_CONNECTED: &str = "motor controller connected";
const STATUS_DONE: &str = "completed";
const STATUS_STOPPED: &str = "stopped";
const STATUS_STOP_PENDING: &str = "stop requested";

/// Where the session is in one run of the motor.
///
/// `StopPending` is the optimistic state entered when a STOP is sent
/// before the device has acknowledged it; `Stopped` is the confirmed
/// state once the firmware reports `STOPPED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Running,
    Done,
    StopPending,
    Stopped,
}

/// One controller session: active command strategy, armed target, and
/// interpreted device state
pub struct MotorSession {
    strategy: CommandStrategy,
    target_speed: i32,
    target_value: i32,
    /// Device-reported progress, in the same unit as `target_value`
    current_progress: i32,
    connected: bool,
    phase: Phase,
    status: String,
}

impl MotorSession {
    /// New session in rotation mode, disconnected, nothing armed
    pub fn new() -> Self {
        Self {
            strategy: CommandStrategy::for_mode(MotorMode::Rotation),
            target_speed: 0,
            target_value: 0,
            current_progress: 0,
            connected: false,
            phase: Phase::Idle,
            status: STATUS_IDLE.to_string(),
        }
    }

    /// Switch operating mode. Swaps the strategy and drops any armed
    /// target and progress; the handshake (`connected`) is kept.
    pub fn set_mode(&mut self, mode: MotorMode) {
        self.strategy = CommandStrategy::for_mode(mode);
        self.target_speed = 0;
        self.target_value = 0;
        self.current_progress = 0;
        self.phase = Phase::Idle;
        self.status = STATUS_IDLE.to_string();
    }

    /// Encode a wire command with the active strategy (no validation)
    pub fn build_command(&self, speed: i32, value: i32) -> String {
        self.strategy.build_command(speed, value)
    }

    /// Validate a (speed, value) pair against the active strategy
    pub fn is_valid_input(&self, speed: i32, value: i32) -> bool {
        self.strategy.is_valid_input(speed, value)
    }

    /// Arm a target. Always succeeds: callers must have run
    /// `is_valid_input` first. Progress restarts at zero; the handshake
    /// state is untouched.
    pub fn set_target(&mut self, speed: i32, value: i32) {
        self.target_speed = speed;
        self.target_value = value;
        self.current_progress = 0;
        self.phase = Phase::Armed;
        self.status = STATUS_IDLE.to_string();
    }

    /// Interpret one framed device message.
    ///
    /// Returns `true` for every `READY` (the handshake is not
    /// deduplicated here; callers detect the first transition by
    /// checking `is_connected()` beforehand). All other messages,
    /// recognized or not, return `false`.
    pub fn process_response(&mut self, message: &str) -> bool {
        let message = message.trim();

        if message == "READY" {
            debug!("handshake response received");
            self.connected = true;
            self.status = STATUS_CONNECTED.to_string();
            return true;
        }

        if let Some(suffix) = message.strip_prefix("TURN:") {
            // Tolerant parse: a garbled count reads as zero progress
            let n = suffix.trim().parse::<i32>().unwrap_or(0);
            self.current_progress = n;
            self.phase = Phase::Running;
            self.status = format!("in progress: {} / {}", n, self.target_value);
        } else if message.contains("DONE") {
            self.phase = Phase::Done;
            self.status = STATUS_DONE.to_string();
        } else if message.contains("STOPPED") {
            self.phase = Phase::Stopped;
            self.status = STATUS_STOPPED.to_string();
        } else {
            debug!("ignoring unrecognized response: {:?}", message);
        }

        false
    }

    /// Record that a STOP command was sent, before the device confirms.
    /// The session stays here until a `STOPPED` response arrives.
    pub fn mark_stop_requested(&mut self) {
        self.phase = Phase::StopPending;
        self.status = STATUS_STOP_PENDING.to_string();
    }

    /// Progress as a percentage of the armed target. Zero when no target
    /// is armed; not clamped, so a device overshooting its target reads
    /// as more than 100.
    pub fn progress(&self) -> i32 {
        if self.target_value == 0 {
            return 0;
        }
        (100.0 * self.current_progress as f32 / self.target_value as f32).round() as i32
    }

    /// Back to the idle baseline. The handshake survives: resetting the
    /// progress display must not force a reconnect.
    pub fn reset(&mut self) {
        self.current_progress = 0;
        self.phase = Phase::Idle;
        self.status = STATUS_IDLE.to_string();
    }

    pub fn status_message(&self) -> &str {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> MotorMode {
        self.strategy.mode()
    }

    /// Unit label for the active mode's target value
    pub fn value_label(&self) -> &'static str {
        self.strategy.value_label()
    }

    pub fn target_value(&self) -> i32 {
        self.target_value
    }
}

impl Default for MotorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_idle_baseline() {
        let session = MotorSession::new();
        assert_eq!(session.mode(), MotorMode::Rotation);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.status_message(), "standing by");
        assert!(!session.is_connected());
        assert_eq!(session.progress(), 0);
    }

    #[test]
    fn test_ready_handshake_sets_connected() {
        let mut session = MotorSession::new();
        assert!(session.process_response("READY"));
        assert!(session.is_connected());
        assert_eq!(session.status_message(), "motor controller connected");
    }

    #[test]
    fn test_ready_is_not_deduplicated() {
        // The firmware may re-send READY; the session reports it every
        // time and lets the caller decide whether it is news
        let mut session = MotorSession::new();
        assert!(session.process_response("READY"));
        assert!(session.process_response("READY"));
        assert!(session.is_connected());
    }

    #[test]
    fn test_turn_updates_progress_percentage() {
        let mut session = MotorSession::new();
        session.set_target(60, 90);
        assert!(!session.process_response("TURN:45"));
        assert_eq!(session.progress(), 50);
        assert_eq!(session.phase(), Phase::Running);
        assert_eq!(session.status_message(), "in progress: 45 / 90");
    }

    #[test]
    fn test_progress_zero_target_guard() {
        let mut session = MotorSession::new();
        session.set_target(60, 0);
        session.process_response("TURN:45");
        assert_eq!(session.progress(), 0);
    }

    #[test]
    fn test_progress_not_clamped_past_target() {
        let mut session = MotorSession::new();
        session.set_target(60, 10);
        session.process_response("TURN:12");
        assert_eq!(session.progress(), 120);
    }

    #[test]
    fn test_turn_with_garbage_count_reads_as_zero() {
        let mut session = MotorSession::new();
        session.set_target(60, 10);
        session.process_response("TURN:5");
        session.process_response("TURN:abc");
        assert_eq!(session.progress(), 0);
        session.process_response("TURN:");
        assert_eq!(session.progress(), 0);
    }

    #[test]
    fn test_done_matched_by_substring() {
        let mut session = MotorSession::new();
        session.process_response("MOTOR IS DONE NOW");
        assert_eq!(session.phase(), Phase::Done);
        assert_eq!(session.status_message(), "completed");
    }

    #[test]
    fn test_stopped_matched_by_substring() {
        let mut session = MotorSession::new();
        session.process_response("MOTOR STOPPED OK");
        assert_eq!(session.phase(), Phase::Stopped);
        assert_eq!(session.status_message(), "stopped");
    }

    #[test]
    fn test_unrecognized_message_ignored() {
        let mut session = MotorSession::new();
        session.set_target(60, 10);
        session.process_response("TURN:5");
        let phase = session.phase();
        let status = session.status_message().to_string();

        assert!(!session.process_response("ESP32 DISCONNECTED"));
        assert_eq!(session.phase(), phase);
        assert_eq!(session.status_message(), status);
    }

    #[test]
    fn test_stop_pending_reconciled_by_stopped() {
        let mut session = MotorSession::new();
        session.set_target(60, 10);
        session.mark_stop_requested();
        assert_eq!(session.phase(), Phase::StopPending);
        assert_eq!(session.status_message(), "stop requested");

        session.process_response("STOPPED");
        assert_eq!(session.phase(), Phase::Stopped);
        assert_eq!(session.status_message(), "stopped");
    }

    #[test]
    fn test_set_target_does_not_touch_handshake() {
        let mut session = MotorSession::new();
        session.process_response("READY");
        session.set_target(60, 10);
        assert!(session.is_connected());
        assert_eq!(session.phase(), Phase::Armed);
        assert_eq!(session.status_message(), "standing by");
    }

    #[test]
    fn test_mode_switch_drops_target_and_progress() {
        let mut session = MotorSession::new();
        session.process_response("READY");
        session.set_target(60, 90);
        session.process_response("TURN:45");

        session.set_mode(MotorMode::Time);
        assert_eq!(session.mode(), MotorMode::Time);
        assert_eq!(session.target_value(), 0);
        assert_eq!(session.progress(), 0);
        assert_eq!(session.phase(), Phase::Idle);
        // The handshake is with the device, not the mode
        assert!(session.is_connected());
    }

    #[test]
    fn test_reset_keeps_connected() {
        let mut session = MotorSession::new();
        session.process_response("READY");
        session.set_target(60, 10);
        session.process_response("TURN:5");

        session.reset();
        assert_eq!(session.progress(), 0);
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.status_message(), "standing by");
        assert!(session.is_connected());
    }

    #[test]
    fn test_turn_after_done_reverts_status() {
        // Ordering is not verified: a late TURN after DONE flips the
        // display back to in-progress. Documented permissive behavior.
        let mut session = MotorSession::new();
        session.set_target(60, 10);
        session.process_response("DONE");
        session.process_response("TURN:10");
        assert_eq!(session.phase(), Phase::Running);
    }

    #[test]
    fn test_full_rotation_run() {
        let mut session = MotorSession::new();
        assert_eq!(session.mode(), MotorMode::Rotation);

        assert!(session.is_valid_input(60, 10));
        assert_eq!(session.build_command(60, 10), "RPM:60 ROT:10");

        session.set_target(60, 10);
        session.process_response("READY");
        session.process_response("TURN:5");
        assert_eq!(session.progress(), 50);

        session.process_response("DONE");
        assert_eq!(session.phase(), Phase::Done);
        assert_eq!(session.status_message(), "completed");
    }
}
