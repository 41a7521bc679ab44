// Framed serial transport to the motor controller
//
// Owns at most one open serial port. A reader thread polls the port and
// reassembles the raw byte stream into newline-delimited messages, so a
// line split across OS reads (or several lines arriving in one read)
// still comes out as one message per line. Messages are delivered over
// an unbounded channel; a hardware-level failure is delivered as the
// synthetic message "ESP32 DISCONNECTED" on that same channel.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serialport::SerialPort;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SERIAL_READ_TIMEOUT;

/// Synthetic message injected when the link drops (cable pulled, port
/// revoked). Delivered through the normal inbound channel; consumers
/// must check for this literal explicitly.
pub const DISCONNECT_MESSAGE: &str = "ESP32 DISCONNECTED";

/// Error types for the serial transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Reassembles a raw byte stream into trimmed, newline-delimited lines.
///
/// Bytes are buffered until a `\n` arrives; carriage returns and
/// surrounding whitespace are stripped and blank lines are dropped.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete message they finish
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut messages = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                messages.push(trimmed.to_string());
            }
        }
        messages
    }
}

struct Connection {
    port: Box<dyn SerialPort>,
    shutdown: Arc<AtomicBool>,
    reader: Option<thread::JoinHandle<()>>,
}

/// Serial transport - handles the physical link to the controller
pub struct SerialTransport {
    connection: Option<Connection>,
    inbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl SerialTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            connection: None,
            inbound_tx: tx,
            inbound_rx: Some(rx),
        }
    }

    /// Take the inbound message channel. Can only be taken once.
    pub fn take_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.inbound_rx.take()
    }

    /// Open a port at the given baud rate (8-N-1, no flow control).
    /// An already-open port is closed first; at most one physical
    /// connection is live at a time.
    pub fn open(&mut self, port_name: &str, baud_rate: u32) -> Result<()> {
        self.close();

        info!("Opening serial port {} at {} baud", port_name, baud_rate);
        let port = serialport::new(port_name, baud_rate)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()?;

        let reader_port = port.try_clone()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let reader = thread::spawn({
            let tx = self.inbound_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            move || read_loop(reader_port, tx, shutdown)
        });

        self.connection = Some(Connection {
            port,
            shutdown,
            reader: Some(reader),
        });
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Write a raw payload to the device. No-op when no port is open;
    /// a write failure is treated as a disconnect.
    pub fn send(&mut self, payload: &[u8]) {
        let Some(conn) = self.connection.as_mut() else {
            debug!("send with no open port, dropping {} bytes", payload.len());
            return;
        };

        if let Err(e) = write_payload(conn.port.as_mut(), payload) {
            warn!("Serial write failed: {}", e);
            self.close();
            let _ = self.inbound_tx.send(DISCONNECT_MESSAGE.to_string());
        }
    }

    /// Close the port and retire its reader thread without emitting a
    /// synthetic disconnect.
    pub fn close(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.shutdown.store(true, Ordering::Relaxed);
            if let Some(reader) = conn.reader.take() {
                // The reader wakes within one read timeout
                let _ = reader.join();
            }
            info!("Serial port closed");
        }
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_payload(port: &mut dyn SerialPort, payload: &[u8]) -> std::io::Result<()> {
    port.write_all(payload)?;
    port.flush()
}

/// Reader thread body: poll the port, frame lines, forward messages.
/// Exits silently on shutdown, with a synthetic disconnect on failure.
fn read_loop(
    mut port: Box<dyn SerialPort>,
    tx: mpsc::UnboundedSender<String>,
    shutdown: Arc<AtomicBool>,
) {
    let mut framer = LineFramer::new();
    let mut buf = [0u8; 256];

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }

        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                for message in framer.push(&buf[..n]) {
                    debug!("Received: {:?}", message);
                    if tx.send(message).is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                if shutdown.load(Ordering::Relaxed) {
                    return;
                }
                warn!("Serial read failed: {}", e);
                break;
            }
        }
    }

    warn!("Serial link lost");
    let _ = tx.send(DISCONNECT_MESSAGE.to_string());
}
