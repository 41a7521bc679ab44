// Desktop controller for a stepper motor behind an ESP32, spoken to
// over a newline-delimited ASCII serial protocol.

pub mod config;
pub mod motor;
pub mod runtime;
pub mod transport;
