use crate::capture_slot::Capture;
use crate::device_message::Modulation;
use crate::sub_file::{RawSignal, SubFileError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "sub";

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    SubFile(#[from] SubFileError),

    #[error("Invalid signal name '{0}'")]
    InvalidName(String),

    #[error("Failed to parse {0}: no pulses found")]
    NoPulses(String),
}

/// A directory of `.sub` files.
#[derive(Debug, Clone)]
pub struct SignalLibrary {
    dir: PathBuf,
}

impl SignalLibrary {
    /// Use `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LibraryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File names of all `.sub` files, sorted.
    pub fn list(&self) -> Result<Vec<String>, LibraryError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Keep alphanumerics, `-` and `_`. `None` if nothing is left.
    pub fn sanitize_name(name: &str) -> Option<String> {
        let safe: String = name
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        (!safe.is_empty()).then_some(safe)
    }

    /// Write `signal` as `<sanitized name>.sub`, replacing any existing file.
    pub fn save(&self, name: &str, signal: &RawSignal) -> Result<PathBuf, LibraryError> {
        let safe =
            Self::sanitize_name(name).ok_or_else(|| LibraryError::InvalidName(name.to_string()))?;
        let path = self.dir.join(format!("{safe}.{EXTENSION}"));
        signal.save(&path)?;
        log::debug!("Saved {}", path.display());
        Ok(path)
    }

    /// Save the capture under inspection. Only raw captures can be saved.
    pub fn save_capture(
        &self,
        name: &str,
        capture: &Capture,
        freq_mhz: f64,
        modulation: Modulation,
        starts_low: bool,
    ) -> Result<PathBuf, LibraryError> {
        let signal = capture.to_signal(freq_mhz, modulation, starts_low)?;
        self.save(name, &signal)
    }

    /// Load a file from the library by file name. A file with no pulses is an
    /// error here, since there is nothing to transmit.
    pub fn load(&self, file_name: &str) -> Result<RawSignal, LibraryError> {
        if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
            return Err(LibraryError::InvalidName(file_name.to_string()));
        }
        let signal = RawSignal::load(self.dir.join(file_name))?;
        if signal.pulses.is_empty() {
            return Err(LibraryError::NoPulses(file_name.to_string()));
        }
        log::debug!("Loaded {} pulses={}", file_name, signal.pulses.len());
        Ok(signal)
    }
}
