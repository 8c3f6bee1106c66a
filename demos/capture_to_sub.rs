// Capture a RAW signal and save it as a .sub file
//
// Configures the radio, starts a receive, waits for the first capture and writes it
// into a signal library directory.

use clap::{Parser, ValueEnum};
use ishtarrf_rs::{
    Capture, CaptureSlot, Command, Modulation, RadioConfig, RadioConnector, RxMode, SignalLibrary,
    TerminalConfig, TerminalEvent,
};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, ValueEnum)]
enum ModArg {
    Ook,
    Fsk2,
}

impl From<ModArg> for Modulation {
    fn from(value: ModArg) -> Self {
        match value {
            ModArg::Ook => Modulation::Ook,
            ModArg::Fsk2 => Modulation::Fsk2,
        }
    }
}

#[derive(Parser)]
#[command(about = "Capture one RAW signal and save it as .sub")]
struct Args {
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,

    /// Frequency in MHz
    #[arg(short, long, default_value_t = 433.92)]
    freq: f64,

    #[arg(short, long, value_enum, default_value_t = ModArg::Ook)]
    modulation: ModArg,

    /// Name of the saved signal (without extension)
    #[arg(short, long)]
    name: String,

    #[arg(long, default_value = "signals")]
    dir: String,

    /// Write the first pulse as LOW (-)
    #[arg(long)]
    start_low: bool,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = RadioConfig::builder()
        .frequency_mhz(args.freq)
        .modulation(args.modulation.into())
        .build()?;
    let library = SignalLibrary::open(&args.dir)?;

    let terminal_config = TerminalConfig {
        baud_rate: args.baud,
        ..TerminalConfig::default()
    };
    let (mut radio, events) = RadioConnector::connect(args.port.as_deref(), terminal_config)?;

    radio.send(&config.to_command());
    radio.send(&Command::rx_start(RxMode::RawOok));

    let slot = CaptureSlot::new();
    let deadline = Instant::now() + Duration::from_secs(args.wait_secs);
    while Instant::now() < deadline {
        let Ok(event) = events.recv_timeout(Duration::from_millis(200)) else {
            continue;
        };
        match event {
            TerminalEvent::ConnectFailed { reason } => {
                println!("[!] Connect failed: {reason}");
                return Ok(());
            }
            TerminalEvent::Message(message) => {
                println!("{message}");
                if slot.observe(&message) && matches!(slot.snapshot(), Some(Capture::Raw(_))) {
                    break;
                }
            }
            other => println!("{other:?}"),
        }
    }
    radio.send(&Command::RxStop);

    match slot.take() {
        Some(capture) => {
            let path = library.save_capture(
                &args.name,
                &capture,
                config.freq_mhz,
                config.modulation,
                args.start_low,
            )?;
            println!("[+] Saved {}", path.display());
        }
        None => println!("[!] No current RX to save."),
    }

    radio.close();
    Ok(())
}
