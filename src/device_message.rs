use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Radio modulation scheme, as spelled on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modulation {
    #[serde(rename = "OOK")]
    Ook,
    #[serde(rename = "2-FSK")]
    Fsk2,
}

impl Modulation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modulation::Ook => "OOK",
            Modulation::Fsk2 => "2-FSK",
        }
    }

    /// Firmware preset written into `.sub` files for this modulation.
    pub fn preset_name(&self) -> &'static str {
        match self {
            Modulation::Ook => crate::sub_file::PRESET_OOK_ASYNC,
            Modulation::Fsk2 => crate::sub_file::PRESET_2FSK,
        }
    }
}

/// Receiver mode for `rx_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RxMode {
    RawOok,
    Packet,
}

impl RxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RxMode::RawOok => "raw_ook",
            RxMode::Packet => "packet",
        }
    }

    /// Receive window the firmware expects for this mode (0 means no timeout).
    pub fn default_timeout_ms(&self) -> u32 {
        match self {
            RxMode::RawOok => 40,
            RxMode::Packet => 0,
        }
    }
}

/// Outbound command. The `cmd` tag selects the shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Ping,
    SetConfig {
        freq: f64,
        #[serde(rename = "mod")]
        modulation: Modulation,
        br_kbps: f64,
        dev_khz: f64,
        tx_power: i32,
    },
    RxStart {
        mode: RxMode,
        timeout_ms: u32,
    },
    RxStop,
    GetRssi,
    TxBytes {
        hex: String,
    },
    TxRaw {
        pulses_us: Vec<u32>,
        repeat: u32,
        gap_ms: u32,
    },
}

impl Command {
    pub fn rx_start(mode: RxMode) -> Self {
        Command::RxStart {
            mode,
            timeout_ms: mode.default_timeout_ms(),
        }
    }

    /// Compact JSON followed by a single `\n`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Fields of an `rx_bytes` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ByteCapture {
    pub hex: Option<String>,
    pub rssi_dbm: Option<f64>,
}

/// Fields of an `rx_raw` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCapture {
    #[serde(default)]
    pub pulses_us: Vec<u32>,
    pub rssi_dbm: Option<f64>,
    pub dur_ms: Option<f64>,
}

#[derive(Deserialize)]
struct AckFields {
    of: Option<Value>,
}

#[derive(Deserialize)]
struct RssiFields {
    value_dbm: Option<f64>,
}

#[derive(Deserialize)]
struct ErrorFields {
    #[serde(default)]
    msg: String,
}

/// One decoded line from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    Pong,
    /// `of` names the acknowledged command. Kept as raw JSON.
    Ack { of: Option<Value> },
    Rssi { value_dbm: Option<f64> },
    RxBytes(ByteCapture),
    RxRaw(RawCapture),
    /// Reported by the device, or synthesized locally for malformed input and
    /// transport failures. `raw` holds the offending line when there is one.
    Error { msg: String, raw: Option<String> },
    /// Parsed object with a missing or unknown `event`.
    Unrecognized(Map<String, Value>),
}

impl DeviceMessage {
    pub fn error(msg: impl Into<String>) -> Self {
        DeviceMessage::Error {
            msg: msg.into(),
            raw: None,
        }
    }

    pub fn malformed(msg: impl Into<String>, raw: &str) -> Self {
        DeviceMessage::Error {
            msg: msg.into(),
            raw: Some(raw.to_string()),
        }
    }

    /// Decode one framed line. Never fails: bad input becomes an `Error`
    /// message carrying the line verbatim.
    pub fn decode(line: &str) -> Self {
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => Self::classify(obj, line),
            Ok(_) => Self::malformed("Device line is not a JSON object", line),
            Err(e) => {
                log::debug!("Bad JSON line from device ({}): {:?}", e, line);
                Self::malformed("Bad JSON line from device", line)
            }
        }
    }

    fn classify(obj: Map<String, Value>, line: &str) -> Self {
        let event = obj.get("event").and_then(Value::as_str).map(str::to_owned);

        let decoded = match event.as_deref() {
            Some("pong") => Ok(DeviceMessage::Pong),
            Some("ok") => fields::<AckFields>(obj, "ok").map(|f| DeviceMessage::Ack { of: f.of }),
            Some("rssi") => fields::<RssiFields>(obj, "rssi").map(|f| DeviceMessage::Rssi {
                value_dbm: f.value_dbm,
            }),
            Some("rx_bytes") => fields(obj, "rx_bytes").map(DeviceMessage::RxBytes),
            Some("rx_raw") => fields(obj, "rx_raw").map(DeviceMessage::RxRaw),
            Some("error") => {
                fields::<ErrorFields>(obj, "error").map(|f| DeviceMessage::error(f.msg))
            }
            _ => Ok(DeviceMessage::Unrecognized(obj)),
        };

        decoded.unwrap_or_else(|msg| Self::malformed(msg, line))
    }

    pub fn is_capture(&self) -> bool {
        matches!(self, DeviceMessage::RxBytes(_) | DeviceMessage::RxRaw(_))
    }
}

fn fields<T: DeserializeOwned>(obj: Map<String, Value>, event: &str) -> Result<T, String> {
    serde_json::from_value(Value::Object(obj)).map_err(|e| format!("Malformed {event} event: {e}"))
}

struct Maybe<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for Maybe<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => fmt::Display::fmt(v, f),
            None => f.write_str("None"),
        }
    }
}

/// One-line event log rendering.
impl fmt::Display for DeviceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceMessage::Pong => write!(f, "[pong]"),
            DeviceMessage::Ack {
                of: Some(Value::String(of)),
            } => write!(f, "[OK] {of}"),
            DeviceMessage::Ack { of } => write!(f, "[OK] {}", Maybe(of)),
            DeviceMessage::Rssi { value_dbm } => write!(f, "[RSSI] {} dBm", Maybe(value_dbm)),
            DeviceMessage::RxBytes(c) => {
                write!(f, "[RX bytes] {} @ {} dBm", Maybe(&c.hex), Maybe(&c.rssi_dbm))
            }
            DeviceMessage::RxRaw(c) => write!(
                f,
                "[RX raw] pulses={} @ {} dBm dur={} ms",
                c.pulses_us.len(),
                Maybe(&c.rssi_dbm),
                Maybe(&c.dur_ms)
            ),
            DeviceMessage::Error { msg, raw: None } => write!(f, "[!] {msg}"),
            DeviceMessage::Error { msg, raw: Some(raw) } => write!(f, "[!] {msg}: {raw}"),
            DeviceMessage::Unrecognized(obj) => write!(f, "[DEV] {}", Value::Object(obj.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_raw_encoding_matches_wire_format() {
        let cmd = Command::TxRaw {
            pulses_us: vec![350, 1200, 350, 1200],
            repeat: 2,
            gap_ms: 20,
        };
        assert_eq!(
            cmd.encode().unwrap(),
            "{\"cmd\":\"tx_raw\",\"pulses_us\":[350,1200,350,1200],\"repeat\":2,\"gap_ms\":20}\n"
        );
    }

    #[test]
    fn test_command_shapes() {
        assert_eq!(Command::Ping.encode().unwrap(), "{\"cmd\":\"ping\"}\n");
        assert_eq!(Command::RxStop.encode().unwrap(), "{\"cmd\":\"rx_stop\"}\n");
        assert_eq!(Command::GetRssi.encode().unwrap(), "{\"cmd\":\"get_rssi\"}\n");
        assert_eq!(
            Command::rx_start(RxMode::RawOok).encode().unwrap(),
            "{\"cmd\":\"rx_start\",\"mode\":\"raw_ook\",\"timeout_ms\":40}\n"
        );
        assert_eq!(
            Command::rx_start(RxMode::Packet).encode().unwrap(),
            "{\"cmd\":\"rx_start\",\"mode\":\"packet\",\"timeout_ms\":0}\n"
        );
        assert_eq!(
            Command::TxBytes {
                hex: "A10B0C0D".to_string()
            }
            .encode()
            .unwrap(),
            "{\"cmd\":\"tx_bytes\",\"hex\":\"A10B0C0D\"}\n"
        );
    }

    #[test]
    fn test_set_config_uses_mod_key() {
        let cmd = Command::SetConfig {
            freq: 433.92,
            modulation: Modulation::Fsk2,
            br_kbps: 2.4,
            dev_khz: 30.0,
            tx_power: -10,
        };
        assert_eq!(
            cmd.encode().unwrap(),
            "{\"cmd\":\"set_config\",\"freq\":433.92,\"mod\":\"2-FSK\",\"br_kbps\":2.4,\"dev_khz\":30.0,\"tx_power\":-10}\n"
        );
    }

    #[test]
    fn test_decode_known_events() {
        assert_eq!(DeviceMessage::decode("{\"event\":\"pong\"}"), DeviceMessage::Pong);
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"ok\",\"of\":\"set_config\"}"),
            DeviceMessage::Ack {
                of: Some(Value::from("set_config"))
            }
        );
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"rssi\",\"value_dbm\":-71.5}"),
            DeviceMessage::Rssi {
                value_dbm: Some(-71.5)
            }
        );
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"rx_bytes\",\"hex\":\"DEAD\",\"rssi_dbm\":-60}"),
            DeviceMessage::RxBytes(ByteCapture {
                hex: Some("DEAD".to_string()),
                rssi_dbm: Some(-60.0)
            })
        );
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"error\",\"msg\":\"radio busy\"}"),
            DeviceMessage::error("radio busy")
        );
    }

    #[test]
    fn test_decode_rx_raw() {
        let msg = DeviceMessage::decode(
            "{\"event\":\"rx_raw\",\"pulses_us\":[100,200,100],\"rssi_dbm\":-42,\"dur_ms\":5}",
        );
        assert_eq!(
            msg,
            DeviceMessage::RxRaw(RawCapture {
                pulses_us: vec![100, 200, 100],
                rssi_dbm: Some(-42.0),
                dur_ms: Some(5.0),
            })
        );
        assert!(msg.is_capture());
    }

    #[test]
    fn test_malformed_line_keeps_raw_text() {
        let line = "{\"event\":\"pong\"";
        match DeviceMessage::decode(line) {
            DeviceMessage::Error { raw, .. } => assert_eq!(raw.as_deref(), Some(line)),
            other => unreachable!("expected error, got {other:?}"),
        }

        let line = "[1,2,3]";
        assert!(matches!(
            DeviceMessage::decode(line),
            DeviceMessage::Error { raw: Some(r), .. } if r == line
        ));
    }

    #[test]
    fn test_mistyped_fields_report_error_with_raw() {
        let line = "{\"event\":\"rx_raw\",\"pulses_us\":\"nope\"}";
        match DeviceMessage::decode(line) {
            DeviceMessage::Error { msg, raw } => {
                assert!(msg.contains("rx_raw"));
                assert_eq!(raw.as_deref(), Some(line));
            }
            other => unreachable!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_ack_accepts_any_of_value() {
        let ack = DeviceMessage::decode("{\"event\":\"ok\",\"of\":5}");
        assert_eq!(
            ack,
            DeviceMessage::Ack {
                of: Some(Value::from(5))
            }
        );
        assert_eq!(ack.to_string(), "[OK] 5");
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"ok\"}"),
            DeviceMessage::Ack { of: None }
        );
    }

    #[test]
    fn test_unknown_or_missing_event_is_unrecognized() {
        match DeviceMessage::decode("{\"event\":\"boot\",\"fw\":\"1.2\"}") {
            DeviceMessage::Unrecognized(obj) => {
                assert_eq!(obj.get("fw"), Some(&Value::from("1.2")));
                assert_eq!(obj.get("event"), Some(&Value::from("boot")));
            }
            other => unreachable!("expected unrecognized, got {other:?}"),
        }
        assert!(matches!(
            DeviceMessage::decode("{\"hello\":1}"),
            DeviceMessage::Unrecognized(_)
        ));
    }

    #[test]
    fn test_display_for_event_log() {
        assert_eq!(DeviceMessage::Pong.to_string(), "[pong]");
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"ok\",\"of\":\"tx_raw\"}").to_string(),
            "[OK] tx_raw"
        );
        assert_eq!(
            DeviceMessage::decode("{\"event\":\"rx_raw\",\"pulses_us\":[1,2],\"rssi_dbm\":-42,\"dur_ms\":5}")
                .to_string(),
            "[RX raw] pulses=2 @ -42 dBm dur=5 ms"
        );
        assert_eq!(
            DeviceMessage::error("Not connected").to_string(),
            "[!] Not connected"
        );
        assert_eq!(
            DeviceMessage::decode("{\"x\":1}").to_string(),
            "[DEV] {\"x\":1}"
        );
    }
}
