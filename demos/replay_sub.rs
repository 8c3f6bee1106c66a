// Replay a saved .sub file
//
// Loads a signal from the library, tunes the radio to the file's frequency and
// transmits the pulse train.

use clap::Parser;
use ishtarrf_rs::{RadioConfig, RadioConnector, SignalLibrary, TerminalConfig, TerminalEvent};
use std::time::Duration;

#[derive(Parser)]
#[command(about = "Transmit a saved .sub file")]
struct Args {
    /// File name inside the library, e.g. garage.sub
    file: String,

    #[arg(short, long)]
    port: Option<String>,

    #[arg(long, default_value = "signals")]
    dir: String,

    #[arg(short, long, default_value_t = 2)]
    repeat: u32,

    #[arg(short, long, default_value_t = 20)]
    gap_ms: u32,

    #[arg(long, default_value_t = 0)]
    tx_power: i32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let library = SignalLibrary::open(&args.dir)?;
    let signal = library.load(&args.file)?;
    println!("[Loaded .sub] {}  pulses={}", args.file, signal.pulses.len());

    // RAW files are replayed with OOK.
    let mut builder = RadioConfig::builder().ook().tx_power_dbm(args.tx_power);
    if let Some(mhz) = signal.frequency_mhz() {
        builder = builder.frequency_mhz(mhz);
    }
    let config = builder.build()?;

    let command = signal.to_tx_command(args.repeat, args.gap_ms)?;

    let (mut radio, events) = RadioConnector::connect(args.port.as_deref(), TerminalConfig::default())?;
    radio.send(&config.to_command());
    radio.send(&command);

    while let Ok(event) = events.recv_timeout(Duration::from_secs(1)) {
        match event {
            TerminalEvent::Message(message) => println!("{message}"),
            other => println!("{other:?}"),
        }
    }

    radio.close();
    Ok(())
}
