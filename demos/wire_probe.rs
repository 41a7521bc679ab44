// Wire probe: read-only check of the serial link to the controller
//
// Sends HELLO and prints every framed line the device sends back for a
// few seconds. Run this before trusting a port with real commands.
//
// Usage: cargo run --example wire_probe -- <port> [baud]
// Example: cargo run --example wire_probe -- /dev/ttyUSB0 115200

use std::time::Duration;

use motor_link::config::DEFAULT_BAUD_RATE;
use motor_link::transport::SerialTransport;

const PROBE_WINDOW: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().ok_or("usage: wire_probe <port> [baud]")?;
    let baud = match args.next() {
        Some(b) => b.parse()?,
        None => DEFAULT_BAUD_RATE,
    };

    let mut transport = SerialTransport::new();
    let mut inbound = transport.take_receiver().expect("fresh transport");
    transport.open(&port, baud)?;

    println!("Probing {} at {} baud for {:?}...", port, baud, PROBE_WINDOW);
    transport.send(b"HELLO\n");

    let deadline = tokio::time::Instant::now() + PROBE_WINDOW;
    loop {
        match tokio::time::timeout_at(deadline, inbound.recv()).await {
            Ok(Some(message)) => println!("  <- {:?}", message),
            Ok(None) => break,
            Err(_) => break, // window elapsed
        }
    }

    transport.close();
    println!("Done.");
    Ok(())
}
