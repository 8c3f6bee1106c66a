use crate::device_message::{Command, Modulation};
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Frequency {0} MHz out of range (300.000 - 928.000)")]
    FrequencyOutOfRange(f64),

    #[error("Bitrate {0} kbps out of range (0.10 - 250.00)")]
    BitrateOutOfRange(f64),

    #[error("Deviation {0} kHz out of range (1.0 - 300.0)")]
    DeviationOutOfRange(f64),

    #[error("TX power {0} dBm out of range (-30 - 10)")]
    TxPowerOutOfRange(i32),

    #[error("Invalid HEX: {0}")]
    InvalidHex(String),

    #[error("Invalid pulses list: {0}")]
    InvalidPulses(String),

    #[error("Repeat {0} out of range (1 - 100)")]
    RepeatOutOfRange(u32),

    #[error("Gap {0} ms out of range (0 - 2000)")]
    GapOutOfRange(u32),
}

/// Validated radio parameters for `set_config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioConfig {
    pub freq_mhz: f64,
    pub modulation: Modulation,
    pub bitrate_kbps: f64,
    pub deviation_khz: f64,
    pub tx_power_dbm: i32,
}

impl RadioConfig {
    pub const FREQ_MHZ: RangeInclusive<f64> = 300.0..=928.0;
    pub const BITRATE_KBPS: RangeInclusive<f64> = 0.10..=250.0;
    pub const DEVIATION_KHZ: RangeInclusive<f64> = 1.0..=300.0;
    pub const TX_POWER_DBM: RangeInclusive<i32> = -30..=10;

    pub fn builder() -> RadioConfigBuilder {
        RadioConfigBuilder::new()
    }

    pub fn to_command(&self) -> Command {
        Command::SetConfig {
            freq: self.freq_mhz,
            modulation: self.modulation,
            br_kbps: self.bitrate_kbps,
            dev_khz: self.deviation_khz,
            tx_power: self.tx_power_dbm,
        }
    }

    /// `.sub` preset for this configuration. Deviation does not affect it.
    pub fn preset(&self) -> &'static str {
        self.modulation.preset_name()
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            freq_mhz: 433.920,
            modulation: Modulation::Ook,
            bitrate_kbps: 2.40,
            deviation_khz: 30.0,
            tx_power_dbm: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RadioConfigBuilder {
    config: RadioConfig,
}

impl RadioConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RadioConfig::default(),
        }
    }

    pub fn frequency_mhz(mut self, mhz: f64) -> Self {
        self.config.freq_mhz = mhz;
        self
    }

    pub fn modulation(mut self, modulation: Modulation) -> Self {
        self.config.modulation = modulation;
        self
    }

    pub fn ook(self) -> Self {
        self.modulation(Modulation::Ook)
    }

    pub fn fsk2(self) -> Self {
        self.modulation(Modulation::Fsk2)
    }

    pub fn bitrate_kbps(mut self, kbps: f64) -> Self {
        self.config.bitrate_kbps = kbps;
        self
    }

    pub fn deviation_khz(mut self, khz: f64) -> Self {
        self.config.deviation_khz = khz;
        self
    }

    pub fn tx_power_dbm(mut self, dbm: i32) -> Self {
        self.config.tx_power_dbm = dbm;
        self
    }

    pub fn build(self) -> Result<RadioConfig, CommandError> {
        let c = self.config;
        if !RadioConfig::FREQ_MHZ.contains(&c.freq_mhz) {
            return Err(CommandError::FrequencyOutOfRange(c.freq_mhz));
        }
        if !RadioConfig::BITRATE_KBPS.contains(&c.bitrate_kbps) {
            return Err(CommandError::BitrateOutOfRange(c.bitrate_kbps));
        }
        if !RadioConfig::DEVIATION_KHZ.contains(&c.deviation_khz) {
            return Err(CommandError::DeviationOutOfRange(c.deviation_khz));
        }
        if !RadioConfig::TX_POWER_DBM.contains(&c.tx_power_dbm) {
            return Err(CommandError::TxPowerOutOfRange(c.tx_power_dbm));
        }
        Ok(c)
    }
}

impl Default for RadioConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sub_file::{PRESET_2FSK, PRESET_OOK_ASYNC};

    #[test]
    fn test_default_config_command() {
        let config = RadioConfig::builder().build().unwrap();
        assert_eq!(
            config.to_command().encode().unwrap(),
            "{\"cmd\":\"set_config\",\"freq\":433.92,\"mod\":\"OOK\",\"br_kbps\":2.4,\"dev_khz\":30.0,\"tx_power\":0}\n"
        );
    }

    #[test]
    fn test_ranges_are_enforced() {
        assert_eq!(
            RadioConfig::builder().frequency_mhz(299.9).build(),
            Err(CommandError::FrequencyOutOfRange(299.9))
        );
        assert_eq!(
            RadioConfig::builder().bitrate_kbps(0.05).build(),
            Err(CommandError::BitrateOutOfRange(0.05))
        );
        assert_eq!(
            RadioConfig::builder().deviation_khz(301.0).build(),
            Err(CommandError::DeviationOutOfRange(301.0))
        );
        assert_eq!(
            RadioConfig::builder().tx_power_dbm(11).build(),
            Err(CommandError::TxPowerOutOfRange(11))
        );
        assert!(RadioConfig::builder()
            .frequency_mhz(928.0)
            .tx_power_dbm(-30)
            .build()
            .is_ok());
    }

    #[test]
    fn test_preset_follows_modulation_only() {
        let ook = RadioConfig::builder().ook().build().unwrap();
        assert_eq!(ook.preset(), PRESET_OOK_ASYNC);

        let narrow = RadioConfig::builder().fsk2().deviation_khz(2.0).build().unwrap();
        let wide = RadioConfig::builder().fsk2().deviation_khz(200.0).build().unwrap();
        assert_eq!(narrow.preset(), PRESET_2FSK);
        assert_eq!(wide.preset(), PRESET_2FSK);
    }
}
