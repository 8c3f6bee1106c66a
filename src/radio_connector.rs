use crate::serial_terminal::{RadioTerminal, TerminalConfig, TerminalEvent};
use serialport::{SerialPortInfo, SerialPortType};
use std::sync::mpsc::Receiver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPort {
    /// Human-readable `"<port> — <description>"`.
    pub label: String,
    pub port: String,
}

impl RadioPort {
    fn from_info(info: &SerialPortInfo) -> Self {
        Self {
            label: format!("{} — {}", info.port_name, describe(&info.port_type)),
            port: info.port_name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("No serial ports found. Please connect the radio or specify the port manually")]
    NoPorts,
}

pub struct RadioConnector;

impl RadioConnector {
    /// Open a terminal on `port`, or on the first available port.
    ///
    /// The outcome of the open arrives on the returned receiver as
    /// `Connected` or `ConnectFailed`.
    pub fn connect(
        port: Option<&str>,
        config: TerminalConfig,
    ) -> Result<(RadioTerminal, Receiver<TerminalEvent>), ConnectorError> {
        let port = match port {
            Some(port) => port.to_string(),
            None => Self::first_port()?.port,
        };
        log::debug!("Connecting to radio on port {}", port);

        let (mut terminal, events) = RadioTerminal::new(config);
        terminal.open_default(&port);
        Ok((terminal, events))
    }

    /// All serial ports the OS reports.
    pub fn available_ports() -> Result<Vec<RadioPort>, ConnectorError> {
        let ports = serialport::available_ports()?;
        Ok(ports.iter().map(RadioPort::from_info).collect())
    }

    pub fn first_port() -> Result<RadioPort, ConnectorError> {
        Self::available_ports()?
            .into_iter()
            .next()
            .ok_or(ConnectorError::NoPorts)
    }
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI serial".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_label() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::PciPort,
        };
        assert_eq!(
            RadioPort::from_info(&info),
            RadioPort {
                label: "/dev/ttyS0 — PCI serial".to_string(),
                port: "/dev/ttyS0".to_string(),
            }
        );

        let info = SerialPortInfo {
            port_name: "COM3".to_string(),
            port_type: SerialPortType::Unknown,
        };
        assert_eq!(RadioPort::from_info(&info).label, "COM3 — n/a");
    }

    #[test]
    fn test_available_ports() {
        // Depends on the host; only check that what is reported is well formed.
        match RadioConnector::available_ports() {
            Ok(ports) => {
                for port in ports {
                    assert!(!port.port.is_empty());
                    assert!(port.label.starts_with(&port.port));
                }
            }
            Err(ConnectorError::SerialPort(_)) => {}
            Err(e) => unreachable!("Unexpected error: {e:?}"),
        }
    }
}
