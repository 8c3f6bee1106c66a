use crate::device_message::{ByteCapture, DeviceMessage, Modulation, RawCapture};
use crate::sub_file::{PulseTrain, RawSignal, SubFileError};
use std::sync::{Mutex, PoisonError};

/// The signal currently under inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    Bytes(ByteCapture),
    Raw(RawCapture),
}

impl Capture {
    /// A loaded file put back under inspection, with no receive metadata.
    pub fn from_signal(signal: &RawSignal) -> Self {
        Capture::Raw(RawCapture {
            pulses_us: signal.pulses.durations().to_vec(),
            rssi_dbm: None,
            dur_ms: None,
        })
    }

    /// Turn a raw capture into a savable signal. Byte captures have no pulse
    /// representation and are rejected.
    pub fn to_signal(
        &self,
        freq_mhz: f64,
        modulation: Modulation,
        starts_low: bool,
    ) -> Result<RawSignal, SubFileError> {
        match self {
            Capture::Raw(raw) => Ok(RawSignal::from_mhz(
                freq_mhz,
                PulseTrain::new(raw.pulses_us.iter().copied(), starts_low),
                modulation,
            )),
            Capture::Bytes(_) => Err(SubFileError::NotRawCapture),
        }
    }
}

/// Latest-capture cache. Each capture replaces the previous one; nothing is
/// queued.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    current: Mutex<Option<Capture>>,
}

impl CaptureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `message` if it is a capture. Returns whether the slot changed.
    pub fn observe(&self, message: &DeviceMessage) -> bool {
        let capture = match message {
            DeviceMessage::RxBytes(c) => Capture::Bytes(c.clone()),
            DeviceMessage::RxRaw(c) => Capture::Raw(c.clone()),
            _ => return false,
        };
        self.store(capture);
        true
    }

    pub fn store(&self, capture: Capture) {
        *self.lock() = Some(capture);
    }

    pub fn snapshot(&self) -> Option<Capture> {
        self.lock().clone()
    }

    /// Drain the slot.
    pub fn take(&self) -> Option<Capture> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Capture>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rx_raw_fills_slot_with_metadata() {
        let slot = CaptureSlot::new();
        let msg = DeviceMessage::decode(
            "{\"event\":\"rx_raw\",\"pulses_us\":[100,200,100],\"rssi_dbm\":-42,\"dur_ms\":5}",
        );
        assert!(slot.observe(&msg));

        match slot.snapshot() {
            Some(Capture::Raw(raw)) => {
                assert_eq!(raw.pulses_us, vec![100, 200, 100]);
                assert_eq!(raw.rssi_dbm, Some(-42.0));
                assert_eq!(raw.dur_ms, Some(5.0));
            }
            other => unreachable!("expected raw capture, got {other:?}"),
        }
    }

    #[test]
    fn test_last_capture_wins_and_other_events_are_ignored() {
        let slot = CaptureSlot::new();
        slot.observe(&DeviceMessage::decode(
            "{\"event\":\"rx_raw\",\"pulses_us\":[1,2],\"rssi_dbm\":-50,\"dur_ms\":1}",
        ));
        slot.observe(&DeviceMessage::decode(
            "{\"event\":\"rx_bytes\",\"hex\":\"BEEF\",\"rssi_dbm\":-61}",
        ));
        assert!(!slot.observe(&DeviceMessage::Pong));
        assert!(!slot.observe(&DeviceMessage::error("Serial read error")));

        assert_eq!(
            slot.snapshot(),
            Some(Capture::Bytes(ByteCapture {
                hex: Some("BEEF".to_string()),
                rssi_dbm: Some(-61.0),
            }))
        );
        assert!(slot.take().is_some());
        assert!(slot.is_empty());
    }

    #[test]
    fn test_only_raw_captures_become_signals() {
        let raw = Capture::Raw(RawCapture {
            pulses_us: vec![300, 0, 300],
            rssi_dbm: Some(-40.0),
            dur_ms: Some(2.0),
        });
        let signal = raw.to_signal(433.92, Modulation::Ook, true).unwrap();
        assert_eq!(signal.frequency_hz, Some(433_920_000));
        assert_eq!(signal.pulses.durations(), &[300, 1, 300]);
        assert!(signal.pulses.starts_low());
        assert_eq!(signal.preset, crate::sub_file::PRESET_OOK_ASYNC);

        let bytes = Capture::Bytes(ByteCapture {
            hex: Some("00".to_string()),
            rssi_dbm: None,
        });
        assert!(matches!(
            bytes.to_signal(433.92, Modulation::Ook, false),
            Err(SubFileError::NotRawCapture)
        ));
    }

    #[test]
    fn test_loaded_signal_goes_back_under_inspection() {
        let signal = RawSignal::decode("Frequency: 433920000\nRAW_Data: 5 -6 7\n");
        assert_eq!(
            Capture::from_signal(&signal),
            Capture::Raw(RawCapture {
                pulses_us: vec![5, 6, 7],
                rssi_dbm: None,
                dur_ms: None,
            })
        );
    }
}
