// Serial link defaults and loop timing
use std::time::Duration;

// ESP32 dev boards talk 115200 8-N-1 by default
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

// Reader poll interval; a timed-out read just means no data yet
pub const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(50);

// Period of the status line printed while a command is in flight
pub const STATUS_TICK: Duration = Duration::from_secs(1);
