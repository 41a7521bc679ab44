// Command encoding for the ESP32 motor firmware
//
// The firmware accepts one ASCII command per line:
//   "RPM:<speed> ROT:<rotations>"  - run at <speed> RPM for N rotations
//   "RPM:<speed> TIME:<seconds>"   - run at <speed> RPM for N seconds
//
// Each mode is a strategy: it knows how to encode a (speed, value) pair
// and what its value domain is. Modes are a closed set, so the strategy
// is a plain enum matched exhaustively rather than a trait object.

/// Motor operating modes supported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorMode {
    /// Target is a number of rotations
    Rotation,
    /// Target is a duration in seconds
    Time,
}

/// Per-mode command encoder and input validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStrategy {
    Rotation,
    Time,
}

impl CommandStrategy {
    /// Select the strategy for a mode
    pub fn for_mode(mode: MotorMode) -> Self {
        match mode {
            MotorMode::Rotation => CommandStrategy::Rotation,
            MotorMode::Time => CommandStrategy::Time,
        }
    }

    /// Encode a wire command. Pure formatting - does NOT validate, so it
    /// can produce a command `is_valid_input` would reject. Callers must
    /// validate before transmitting.
    pub fn build_command(&self, speed: i32, value: i32) -> String {
        match self {
            CommandStrategy::Rotation => format!("RPM:{speed} ROT:{value}"),
            CommandStrategy::Time => format!("RPM:{speed} TIME:{value}"),
        }
    }

    /// Check a (speed, value) pair against the mode's domain.
    ///
    /// Both modes currently require strictly positive integers, but the
    /// rule is written per variant so a future mode can carry a bounded
    /// range without touching the others.
    pub fn is_valid_input(&self, speed: i32, value: i32) -> bool {
        match self {
            CommandStrategy::Rotation => speed > 0 && value > 0,
            CommandStrategy::Time => speed > 0 && value > 0,
        }
    }

    pub fn mode(&self) -> MotorMode {
        match self {
            CommandStrategy::Rotation => MotorMode::Rotation,
            CommandStrategy::Time => MotorMode::Time,
        }
    }

    /// Unit label for the target value, for display next to the input field
    pub fn value_label(&self) -> &'static str {
        match self {
            CommandStrategy::Rotation => "rotations",
            CommandStrategy::Time => "seconds",
        }
    }
}
