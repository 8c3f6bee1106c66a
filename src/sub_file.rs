//! RAW `.sub` signal files.
//!
//! A file holds one signal: a short header followed by a signed pulse list,
//! where the sign of each value gives the level of that pulse:
//!
//! ```text
//! Filetype: IshtarRF SubGhz RAW File
//! Version: 1
//! Frequency: 433920000
//! Preset: FuriHalSubGhzPresetOok270Async
//! Protocol: RAW
//! RAW_Data: 350 -1200 350 -1200
//! ```
//!
//! `RAW_Data` carries at most [`RAW_DATA_WRAP`] values per line; further values
//! go on continuation lines that start with a single space.

use crate::device_message::{Command, Modulation};
use crate::radio_config::CommandError;
use crate::tx_input::check_repeat_gap;
use std::fs;
use std::io;
use std::path::Path;

pub const FILETYPE: &str = "IshtarRF SubGhz RAW File";
pub const VERSION: u32 = 1;
pub const PROTOCOL_RAW: &str = "RAW";
pub const RAW_DATA_WRAP: usize = 64;

pub const PRESET_OOK_ASYNC: &str = "FuriHalSubGhzPresetOok270Async";
pub const PRESET_2FSK: &str = "FuriHalSubGhzPreset2FSKDev";

const RAW_DATA_MARKER: &str = "RAW_Data";

#[derive(Debug, thiserror::Error)]
pub enum SubFileError {
    #[error("Signal has no frequency, cannot write a .sub file")]
    MissingFrequency,

    #[error("Only RAW captures can be saved as .sub")]
    NotRawCapture,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convert MHz to whole Hz, rounding to the nearest Hz.
#[allow(clippy::cast_sign_loss)]
pub fn mhz_to_hz(mhz: f64) -> u64 {
    (mhz * 1_000_000.0).round() as u64
}

/// Convert Hz to MHz, rounded to 3 decimals (kHz resolution).
#[allow(clippy::cast_precision_loss)]
pub fn hz_to_mhz(hz: u64) -> f64 {
    (hz as f64 / 1_000.0).round() / 1_000.0
}

/// Alternating-level pulse durations in microseconds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PulseTrain {
    durations: Vec<u32>,
    starts_low: bool,
}

impl PulseTrain {
    /// Durations below 1 µs are clamped to 1.
    pub fn new(durations: impl IntoIterator<Item = u32>, starts_low: bool) -> Self {
        Self {
            durations: durations.into_iter().map(|d| d.max(1)).collect(),
            starts_low,
        }
    }

    /// Build from signed values: magnitudes become durations and the sign of
    /// the first value gives the starting level.
    pub fn from_signed(values: &[i64]) -> Self {
        let starts_low = values.first().is_some_and(|v| *v < 0);
        let durations = values
            .iter()
            .map(|v| u32::try_from(v.unsigned_abs()).unwrap_or(u32::MAX));
        Self::new(durations, starts_low)
    }

    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    pub fn starts_low(&self) -> bool {
        self.starts_low
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Signed representation: even indices carry the starting level.
    pub fn signed(&self) -> impl Iterator<Item = i64> + '_ {
        let first = if self.starts_low { -1 } else { 1 };
        self.durations.iter().enumerate().map(move |(i, d)| {
            let sign = if i % 2 == 0 { first } else { -first };
            sign * i64::from(*d)
        })
    }
}

/// A RAW signal as stored in a `.sub` file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    pub frequency_hz: Option<u64>,
    pub pulses: PulseTrain,
    pub preset: String,
    pub protocol: String,
    pub repeat: Option<u32>,
}

impl RawSignal {
    pub fn new(frequency_hz: Option<u64>, pulses: PulseTrain, preset: impl Into<String>) -> Self {
        Self {
            frequency_hz,
            pulses,
            preset: preset.into(),
            protocol: PROTOCOL_RAW.to_string(),
            repeat: None,
        }
    }

    /// Signal at `freq_mhz` with the preset matching `modulation`.
    pub fn from_mhz(freq_mhz: f64, pulses: PulseTrain, modulation: Modulation) -> Self {
        Self::new(Some(mhz_to_hz(freq_mhz)), pulses, modulation.preset_name())
    }

    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn frequency_mhz(&self) -> Option<f64> {
        self.frequency_hz.map(hz_to_mhz)
    }

    /// `tx_raw` command replaying this signal. Repeat and gap are checked
    /// against the same ranges as operator-typed pulse lists.
    pub fn to_tx_command(&self, repeat: u32, gap_ms: u32) -> Result<Command, CommandError> {
        check_repeat_gap(repeat, gap_ms)?;
        Ok(Command::TxRaw {
            pulses_us: self.pulses.durations().to_vec(),
            repeat,
            gap_ms,
        })
    }

    /// Render the `.sub` text.
    ///
    /// An empty pulse train writes no `RAW_Data` line at all, so its
    /// `starts_low` is not stored and decodes back as `false`.
    pub fn encode(&self) -> Result<String, SubFileError> {
        let frequency_hz = self.frequency_hz.ok_or(SubFileError::MissingFrequency)?;

        let mut lines = vec![
            format!("Filetype: {FILETYPE}"),
            format!("Version: {VERSION}"),
            format!("Frequency: {frequency_hz}"),
            format!("Preset: {}", self.preset),
            format!("Protocol: {PROTOCOL_RAW}"),
        ];
        if let Some(repeat) = self.repeat {
            lines.push(format!("Repeat: {repeat}"));
        }

        let signed: Vec<String> = self.pulses.signed().map(|v| v.to_string()).collect();
        for (i, chunk) in signed.chunks(RAW_DATA_WRAP).enumerate() {
            let prefix = if i == 0 { "RAW_Data: " } else { " " };
            lines.push(format!("{prefix}{}", chunk.join(" ")));
        }

        let mut content = lines.join("\n");
        content.push('\n');
        Ok(content)
    }

    /// Parse `.sub` text. Missing pieces give a partial result, never an error:
    /// no frequency line leaves `frequency_hz` empty, and no `RAW_Data` gives
    /// an empty pulse train.
    pub fn decode(text: &str) -> Self {
        let frequency_hz = find_frequency(text);

        let raw_pos = text.find(RAW_DATA_MARKER);
        let header = &text[..raw_pos.unwrap_or(text.len())];

        let pulses = raw_pos.map_or_else(PulseTrain::default, |pos| {
            PulseTrain::from_signed(&scan_signed_integers(&text[pos..]))
        });

        Self {
            frequency_hz,
            pulses,
            preset: header_value(header, "Preset:").unwrap_or_default().to_string(),
            protocol: header_value(header, "Protocol:")
                .unwrap_or(PROTOCOL_RAW)
                .to_string(),
            repeat: header_value(header, "Repeat:").and_then(|v| v.parse().ok()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SubFileError> {
        let content = self.encode()?;
        fs::write(path.as_ref(), content)?;
        log::debug!("Wrote {} pulses to {}", self.pulses.len(), path.as_ref().display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SubFileError> {
        let bytes = fs::read(path.as_ref())?;
        Ok(Self::decode(&String::from_utf8_lossy(&bytes)))
    }
}

/// First `Frequency: <digits>` at the start of a line (leading whitespace allowed).
fn find_frequency(text: &str) -> Option<u64> {
    let line_starts = std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1));
    for start in line_starts {
        let Some(rest) = text[start..].trim_start().strip_prefix("Frequency:") else {
            continue;
        };
        let rest = rest.trim_start();
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end > 0 {
            return rest[..end].parse().ok();
        }
    }
    None
}

fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    header
        .lines()
        .find_map(|line| line.trim().strip_prefix(key))
        .map(str::trim)
}

/// Every `-?digits` token in `text`, in order, regardless of line layout.
/// Magnitudes that do not fit an `i64` saturate.
fn scan_signed_integers(text: &str) -> Vec<i64> {
    let bytes = text.as_bytes();
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let negative = bytes[i] == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        let start = if negative { i + 1 } else { i };
        if !bytes[start].is_ascii_digit() {
            i += 1;
            continue;
        }

        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let magnitude = text[start..end].parse::<i64>().unwrap_or(i64::MAX);
        values.push(if negative { -magnitude } else { magnitude });
        i = end;
    }

    values
}
