//! Operator-typed transmit payloads, validated before anything reaches the
//! transport.

use crate::device_message::Command;
use crate::radio_config::CommandError;
use std::ops::RangeInclusive;

pub const REPEAT_RANGE: RangeInclusive<u32> = 1..=100;
pub const GAP_MS_RANGE: RangeInclusive<u32> = 0..=2000;

/// Hex text with whitespace removed. Must be non-empty and even-length.
pub fn parse_hex_payload(text: &str) -> Result<String, CommandError> {
    let hex: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if hex.is_empty() {
        return Err(CommandError::InvalidHex("empty payload".to_string()));
    }
    if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CommandError::InvalidHex(format!("'{bad}' is not a hex digit")));
    }
    if hex.len() % 2 != 0 {
        return Err(CommandError::InvalidHex(format!(
            "odd number of digits ({})",
            hex.len()
        )));
    }
    Ok(hex)
}

/// Comma-separated pulse durations in µs. Blank entries are skipped.
pub fn parse_pulse_list(text: &str) -> Result<Vec<u32>, CommandError> {
    let pulses = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<u32>() {
            Ok(0) | Err(_) => Err(CommandError::InvalidPulses(format!(
                "'{s}' is not a positive integer"
            ))),
            Ok(us) => Ok(us),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if pulses.is_empty() {
        return Err(CommandError::InvalidPulses("no pulses given".to_string()));
    }
    Ok(pulses)
}

pub fn tx_bytes(text: &str) -> Result<Command, CommandError> {
    Ok(Command::TxBytes {
        hex: parse_hex_payload(text)?,
    })
}

/// Repeat count and inter-repeat gap accepted by `tx_raw`.
pub fn check_repeat_gap(repeat: u32, gap_ms: u32) -> Result<(), CommandError> {
    if !REPEAT_RANGE.contains(&repeat) {
        return Err(CommandError::RepeatOutOfRange(repeat));
    }
    if !GAP_MS_RANGE.contains(&gap_ms) {
        return Err(CommandError::GapOutOfRange(gap_ms));
    }
    Ok(())
}

pub fn tx_raw(text: &str, repeat: u32, gap_ms: u32) -> Result<Command, CommandError> {
    check_repeat_gap(repeat, gap_ms)?;
    Ok(Command::TxRaw {
        pulses_us: parse_pulse_list(text)?,
        repeat,
        gap_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_payload() {
        assert_eq!(parse_hex_payload("A1 0B 0c 0D").unwrap(), "A10B0c0D");
        assert!(matches!(
            parse_hex_payload("ABC"),
            Err(CommandError::InvalidHex(_))
        ));
        assert!(matches!(
            parse_hex_payload("ZZ"),
            Err(CommandError::InvalidHex(_))
        ));
        assert!(matches!(
            parse_hex_payload("   "),
            Err(CommandError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_pulse_list() {
        assert_eq!(
            parse_pulse_list("350, 1200,,350 ,1200,").unwrap(),
            vec![350, 1200, 350, 1200]
        );
        assert!(parse_pulse_list("350,abc").is_err());
        assert!(parse_pulse_list("350,-5").is_err());
        assert!(parse_pulse_list("0").is_err());
        assert!(parse_pulse_list(" , ").is_err());
    }

    #[test]
    fn test_tx_raw_command() {
        assert_eq!(
            tx_raw("350,1200,350,1200", 2, 20).unwrap(),
            Command::TxRaw {
                pulses_us: vec![350, 1200, 350, 1200],
                repeat: 2,
                gap_ms: 20
            }
        );
        assert_eq!(
            tx_raw("350", 0, 20),
            Err(CommandError::RepeatOutOfRange(0))
        );
        assert_eq!(
            tx_raw("350", 1, 2001),
            Err(CommandError::GapOutOfRange(2001))
        );
    }

    #[test]
    fn test_tx_bytes_command() {
        assert_eq!(
            tx_bytes("A10B0C0D").unwrap(),
            Command::TxBytes {
                hex: "A10B0C0D".to_string()
            }
        );
    }
}
