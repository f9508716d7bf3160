//! Serial port connection and discovery
//!
//! Opens the link to the inference board and enumerates USB serial adapters.

use crate::config::{FlowControlSetting, LinkConfig};
use crate::exchange::DeviceLink;
use anyhow::{Context, Result};
use colored::Colorize;
use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

impl From<FlowControlSetting> for FlowControl {
    fn from(setting: FlowControlSetting) -> Self {
        match setting {
            FlowControlSetting::None => FlowControl::None,
            FlowControlSetting::Hardware => FlowControl::Hardware,
            FlowControlSetting::Software => FlowControl::Software,
        }
    }
}

/// Exclusively owned serial link. The port closes when this is dropped.
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    port_path: String,
}

impl SerialConnection {
    /// Open the port described by `config` with 8N1 framing
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(config.flow_control.into())
            .timeout(config.read_timeout())
            .open()
            .with_context(|| format!("Failed to open serial port: {}", config.port))?;

        info!(
            "Opened {} at {} baud (flow control: {})",
            config.port, config.baud_rate, config.flow_control
        );

        Ok(Self {
            port,
            port_path: config.port.clone(),
        })
    }

    pub fn port_path(&self) -> &str {
        &self.port_path
    }

    /// Drop anything left in the receive buffer from an earlier session
    pub fn clear_input(&mut self) -> Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .with_context(|| "Failed to clear serial input buffer")
    }
}

impl Read for SerialConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl DeviceLink for SerialConnection {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::from)
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        debug!("Closing serial port {}", self.port_path);
    }
}

/// Information about a detected serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub port_type: PortType,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortType {
    UsbSerial,
    PciSerial,
    Bluetooth,
    Unknown,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::UsbSerial => write!(f, "USB Serial"),
            PortType::PciSerial => write!(f, "PCI Serial"),
            PortType::Bluetooth => write!(f, "Bluetooth"),
            PortType::Unknown => write!(f, "Unknown"),
        }
    }
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(p: serialport::SerialPortInfo) -> Self {
        let mut info = PortInfo {
            path: p.port_name,
            port_type: PortType::Unknown,
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        };

        match p.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                info.port_type = PortType::UsbSerial;
                info.manufacturer = usb.manufacturer;
                info.product = usb.product;
                info.serial_number = usb.serial_number;
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
            }
            serialport::SerialPortType::PciPort => info.port_type = PortType::PciSerial,
            serialport::SerialPortType::BluetoothPort => info.port_type = PortType::Bluetooth,
            serialport::SerialPortType::Unknown => {}
        }

        info
    }
}

/// List all available serial ports
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().with_context(|| "Failed to enumerate serial ports")?;
    Ok(ports.into_iter().map(PortInfo::from).collect())
}

/// USB-UART bridge chips the MLP board ships with or is commonly wired to
const BRIDGE_CHIPS: &[(u16, u16, &str)] = &[
    (0x0403, 0x6001, "FTDI FT232R"),
    (0x0403, 0x6010, "FTDI FT2232"),
    (0x0403, 0x6014, "FTDI FT232H"),
    (0x10c4, 0xea60, "Silicon Labs CP210x"),
    (0x1a86, 0x7523, "WCH CH340"),
    (0x067b, 0x2303, "Prolific PL2303"),
];

impl PortInfo {
    /// Name of the bridge chip, if it is one we know
    pub fn bridge_chip(&self) -> Option<&'static str> {
        let (vid, pid) = (self.vid?, self.pid?);
        BRIDGE_CHIPS
            .iter()
            .find(|(v, p, _)| *v == vid && *p == pid)
            .map(|(_, _, name)| *name)
    }

    /// One-line summary: chip, product or vendor, then VID:PID and serial
    pub fn summary(&self) -> String {
        let mut line = self
            .bridge_chip()
            .map(str::to_string)
            .or_else(|| self.product.clone())
            .or_else(|| self.manufacturer.clone())
            .unwrap_or_else(|| self.port_type.to_string());

        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            line.push_str(&format!(" ({:04x}:{:04x})", vid, pid));
        }
        if let Some(ref sn) = self.serial_number {
            line.push_str(&format!(" sn {}", sn));
        }
        line
    }
}

/// Print available ports, marking the one `infer` would open
pub fn print_ports(configured: &str) -> Result<()> {
    let ports = list_ports()?;

    println!("{}", "Serial Ports".cyan().bold());
    println!("{}", "=".repeat(60));

    for port in &ports {
        let marker = if port.path == configured {
            "*".green().bold()
        } else {
            " ".normal()
        };
        println!(
            "{} {} {}",
            marker,
            format!("{:<20}", port.path).white().bold(),
            port.summary()
        );
    }

    println!("{}", "=".repeat(60));

    if ports.iter().any(|p| p.path == configured) {
        println!("{} configured port {}", "*".green().bold(), configured);
    } else {
        println!(
            "{} Configured port {} is not present",
            "[WARNING]".yellow().bold(),
            configured.white()
        );
        println!("  Plug in the board, or pass -p / set INFERENCE_LINK_PORT to one listed above");
    }

    Ok(())
}
