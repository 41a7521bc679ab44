// Motor protocol module
//
// Provides:
// - Per-mode command encoding and input validation
// - The session state machine interpreting device responses

mod command;
mod session;

pub use command::{CommandStrategy, MotorMode};
pub use session::{MotorSession, Phase};
