// src/ports/enumerate.rs
//! Host serial port enumeration and classification

use super::{CandidatePort, PortSource};
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::{debug, warn};

/// Wireless links that are never the receiver under test
const DENY_TERMS: &[&str] = &["BLUETOOTH", "BT", "WIRELESS"];

/// GlobalSat BU-353N5 and other u-blox based receivers
const GPS_DESCRIPTION_TERMS: &[&str] = &["BU-353N5", "GLOBALSAT", "UBLOX", "U-BLOX", "GPS", "GNSS"];

/// `VID:PID=1546:` is the u-blox USB vendor id
const GPS_HWID_TERMS: &[&str] = &["UBLOX", "U-BLOX", "GPS", "VID:PID=1546:"];

/// What the OS tells us about one serial interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDescriptor {
    pub path: String,
    pub description: Option<String>,
    pub hardware_id: Option<String>,
}

impl PortDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hardware_id(mut self, hardware_id: impl Into<String>) -> Self {
        self.hardware_id = Some(hardware_id.into());
        self
    }
}

impl From<SerialPortInfo> for PortDescriptor {
    fn from(info: SerialPortInfo) -> Self {
        let path = info.port_name;
        match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = usb
                    .product
                    .clone()
                    .or_else(|| usb.manufacturer.clone())
                    .unwrap_or_else(|| "USB Serial Device".to_string());

                let mut hardware_id = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                if let Some(serial) = &usb.serial_number {
                    hardware_id.push_str(&format!(" SER={}", serial));
                }

                Self {
                    path,
                    description: Some(description),
                    hardware_id: Some(hardware_id),
                }
            }
            SerialPortType::BluetoothPort => PortDescriptor::new(path).with_description("Bluetooth serial port"),
            SerialPortType::PciPort => PortDescriptor::new(path).with_description("PCI serial port"),
            SerialPortType::Unknown => PortDescriptor::new(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClass {
    /// Bluetooth or other wireless link
    Excluded,
    GpsReceiver,
    /// Generic USB-serial adapter with no GPS markers
    UsbSerial,
    Unrelated,
}

fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}

/// Classify a device from its description and hardware id (case-insensitive).
pub fn classify(port: &PortDescriptor) -> PortClass {
    let description = port.description.as_deref().unwrap_or_default().to_uppercase();
    let hardware_id = port.hardware_id.as_deref().unwrap_or_default().to_uppercase();

    if contains_any(&description, DENY_TERMS) {
        PortClass::Excluded
    } else if contains_any(&description, GPS_DESCRIPTION_TERMS) || contains_any(&hardware_id, GPS_HWID_TERMS) {
        PortClass::GpsReceiver
    } else if description.contains("USB") && description.contains("SERIAL") {
        PortClass::UsbSerial
    } else {
        PortClass::Unrelated
    }
}

/// Pick the probe-worthy devices: GPS receivers first, then generic
/// USB-serial adapters, each group in enumeration order.
pub fn discover(ports: &[PortDescriptor]) -> Vec<CandidatePort> {
    let mut receivers = Vec::new();
    let mut adapters = Vec::new();

    for port in ports {
        let class = classify(port);
        debug!(path = %port.path, description = ?port.description, ?class, "classified serial port");
        match class {
            PortClass::GpsReceiver => receivers.push(CandidatePort::new(&port.path, PortSource::Discovered)),
            PortClass::UsbSerial => adapters.push(CandidatePort::new(&port.path, PortSource::Discovered)),
            PortClass::Excluded | PortClass::Unrelated => {}
        }
    }

    receivers.extend(adapters);
    receivers
}

/// Ask the OS for its serial ports. Failure is logged and yields an empty list.
pub fn system_ports() -> Vec<PortDescriptor> {
    match tokio_serial::available_ports() {
        Ok(ports) => ports.into_iter().map(PortDescriptor::from).collect(),
        Err(e) => {
            warn!("Failed to list serial ports: {}", e);
            Vec::new()
        }
    }
}
