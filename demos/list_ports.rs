// Serial port discovery example
//
// Lists the serial ports the radio could be attached to, then pings the chosen one.

use clap::Parser;
use ishtarrf_rs::{Command, RadioConnector, TerminalConfig, TerminalEvent};
use std::time::Duration;

#[derive(Parser)]
#[command(about = "List serial ports and ping an IshtarRF radio")]
struct Args {
    /// Port to ping (defaults to the first port found)
    #[arg(short, long)]
    port: Option<String>,

    /// Only list ports, do not connect
    #[arg(long)]
    list_only: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let ports = RadioConnector::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found. Please connect the radio and try again.");
        return Ok(());
    }
    println!("Found {} port(s):", ports.len());
    for (i, port) in ports.iter().enumerate() {
        println!("  {}. {}", i + 1, port.label);
    }
    if args.list_only {
        return Ok(());
    }

    let (mut radio, events) = RadioConnector::connect(args.port.as_deref(), TerminalConfig::default())?;
    match events.recv_timeout(Duration::from_secs(2))? {
        TerminalEvent::Connected { port } => println!("\n[+] Connected to {port}"),
        TerminalEvent::ConnectFailed { reason } => {
            println!("\n[!] Connect failed: {reason}");
            return Ok(());
        }
        other => println!("{other:?}"),
    }

    radio.send(&Command::Ping);
    while let Ok(event) = events.recv_timeout(Duration::from_secs(1)) {
        if let TerminalEvent::Message(message) = event {
            println!("{message}");
        }
    }

    radio.close();
    Ok(())
}
