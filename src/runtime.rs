// Single-threaded event loop driving one motor run
//
// Flow: open the port, send HELLO, wait for the READY handshake, then
// arm and send the requested command and follow the device's progress
// reports until it says DONE or STOPPED. Ctrl-C sends STOP and waits
// for the confirmation; the UI state flips to "stop requested"
// immediately, before the device acknowledges.

use tokio::signal;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::STATUS_TICK;
use crate::motor::{MotorMode, MotorSession, Phase};
use crate::transport::{SerialTransport, DISCONNECT_MESSAGE};

/// One motor run as requested on the command line
pub struct RunConfig {
    pub port: String,
    pub baud_rate: u32,
    pub mode: MotorMode,
    pub speed: i32,
    pub value: i32,
}

pub async fn run(cfg: RunConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut session = MotorSession::new();
    session.set_mode(cfg.mode);

    // Validation always precedes arming and transmission
    if !session.is_valid_input(cfg.speed, cfg.value) {
        return Err(format!(
            "invalid target: speed and {} must be positive (got {} RPM, {})",
            session.value_label(),
            cfg.speed,
            cfg.value
        )
        .into());
    }

    let mut transport = SerialTransport::new();
    let mut inbound = transport
        .take_receiver()
        .expect("receiver taken exactly once");
    transport.open(&cfg.port, cfg.baud_rate)?;

    info!("Waiting for motor controller on {}...", cfg.port);
    transport.send(b"HELLO\n");

    let mut tick = interval(STATUS_TICK);

    loop {
        tokio::select! {
            maybe_message = inbound.recv() => {
                let Some(message) = maybe_message else { break };

                if message == DISCONNECT_MESSAGE {
                    transport.close();
                    error!("Motor controller disconnected, reconnect and retry");
                    return Err("serial link lost".into());
                }

                let was_connected = session.is_connected();
                if session.process_response(&message) && !was_connected {
                    // First READY: acknowledge, then arm and send
                    info!("Motor controller connected");
                    transport.send(b"HI");

                    let command = session.build_command(cfg.speed, cfg.value);
                    session.set_target(cfg.speed, cfg.value);
                    info!(
                        "Sending command: {} ({} RPM, {} {})",
                        command, cfg.speed, cfg.value, session.value_label()
                    );
                    transport.send(command.as_bytes());
                }

                match session.phase() {
                    Phase::Done | Phase::Stopped => {
                        info!("{}", session.status_message());
                        break;
                    }
                    _ => {}
                }
            }
            _ = tick.tick() => {
                if session.phase() == Phase::Running {
                    info!("{} ({}%)", session.status_message(), session.progress());
                }
            }
            _ = signal::ctrl_c() => {
                if session.phase() == Phase::StopPending {
                    // Second Ctrl-C: give up on the confirmation
                    warn!("Stop not confirmed, closing anyway");
                    break;
                }
                warn!("Stop requested, halting motor");
                transport.send(b"STOP");
                session.mark_stop_requested();
                // Keep the loop alive until STOPPED comes back
            }
        }
    }

    transport.close();
    Ok(())
}
