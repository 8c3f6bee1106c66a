//! # IshtarRF RS
//!
//! A Rust library for talking to an IshtarRF sub-GHz transceiver over a serial
//! link and for reading and writing RAW `.sub` signal files.
//!
//! The device speaks newline-delimited JSON: one command object per line
//! towards the radio, one event object per line back. A dedicated reader
//! thread frames and decodes the incoming stream so the caller never blocks
//! on the device.
//!
//! ## Features
//!
//! - **Serial transport**: [`RadioTerminal`] owns one connection at a time and
//!   reports every outcome, including failures, as a [`TerminalEvent`]
//! - **Typed commands**: [`Command`] covers the full command set, and
//!   [`RadioConfig`] validates radio parameters before they are sent
//! - **Capture cache**: [`CaptureSlot`] keeps the most recent capture under
//!   inspection
//! - **`.sub` files**: [`RawSignal`] encodes and decodes the RAW signal format,
//!   and [`SignalLibrary`] manages a directory of saved signals
//!
//! ## Examples
//!
//! ### Connecting and configuring
//!
//! ```rust,no_run
//! use ishtarrf_rs::{RadioConfig, RadioTerminal, TerminalConfig, TerminalEvent};
//!
//! let (mut radio, events) = RadioTerminal::new(TerminalConfig::default());
//! radio.open_default("/dev/ttyUSB0");
//!
//! if let Ok(TerminalEvent::Connected { port }) = events.recv() {
//!     println!("Connected to {port}");
//!     let config = RadioConfig::builder().frequency_mhz(433.92).ook().build()?;
//!     radio.send(&config.to_command());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Capturing a signal and saving it
//!
//! ```rust,no_run
//! use ishtarrf_rs::{
//!     CaptureSlot, Command, Modulation, RadioTerminal, RxMode, SignalLibrary, TerminalConfig,
//!     TerminalEvent,
//! };
//!
//! let (mut radio, events) = RadioTerminal::new(TerminalConfig::default());
//! radio.open_default("/dev/ttyUSB0");
//! radio.send(&Command::rx_start(RxMode::RawOok));
//!
//! let slot = CaptureSlot::new();
//! for event in events.iter() {
//!     if let TerminalEvent::Message(message) = event {
//!         println!("{message}");
//!         if slot.observe(&message) {
//!             break;
//!         }
//!     }
//! }
//!
//! let library = SignalLibrary::open("signals")?;
//! if let Some(capture) = slot.take() {
//!     library.save_capture("garage", &capture, 433.92, Modulation::Ook, false)?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Round-tripping a `.sub` file
//!
//! ```rust
//! use ishtarrf_rs::{Modulation, PulseTrain, RawSignal};
//!
//! let signal = RawSignal::from_mhz(433.92, PulseTrain::new(vec![350, 1200], false), Modulation::Ook);
//! let text = signal.encode().unwrap();
//! assert!(text.contains("RAW_Data: 350 -1200\n"));
//! assert_eq!(RawSignal::decode(&text), signal);
//! ```

pub mod capture_slot;
pub mod device_message;
pub mod line_framer;
pub mod radio_config;
pub mod radio_connector;
pub mod serial_terminal;
pub mod signal_library;
pub mod sub_file;
pub mod tx_input;

// Re-export the main types for convenience
pub use capture_slot::{Capture, CaptureSlot};

pub use device_message::{ByteCapture, Command, DeviceMessage, Modulation, RawCapture, RxMode};

pub use line_framer::{FramedLine, LineFramer};

pub use radio_config::{CommandError, RadioConfig, RadioConfigBuilder};

pub use radio_connector::{ConnectorError, RadioConnector, RadioPort};

pub use serial_terminal::{
    ConnectionState, PortOpener, RadioTerminal, SerialLink, SystemPorts, TerminalConfig,
    TerminalError, TerminalEvent,
};

pub use signal_library::{LibraryError, SignalLibrary};

pub use sub_file::{PulseTrain, RawSignal, SubFileError};
