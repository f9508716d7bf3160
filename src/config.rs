//! Link configuration
//!
//! Settings are layered: link profile defaults, then an optional TOML file,
//! then command-line flags. Files and flags only override the fields they set.
//!
//! ```toml
//! port = "/dev/ttyUSB1"
//! baud_rate = 115200
//! timeout_ms = 1000
//! byte_delay_ms = 10
//! settle_ms = 100
//! open_delay_ms = 100
//! flow_control = "none"
//! ```

use crate::exchange::Pacing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default serial device the MLP board enumerates as
pub const DEFAULT_PORT: &str = "/dev/ttyUSB1";

/// Baud rate the firmware UART is built for
pub const DEFAULT_BAUD: u32 = 115200;

/// Flow control mode for the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControlSetting {
    #[default]
    None,
    /// RTS/CTS
    Hardware,
    /// XON/XOFF
    Software,
}

impl fmt::Display for FlowControlSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowControlSetting::None => write!(f, "none"),
            FlowControlSetting::Hardware => write!(f, "hardware"),
            FlowControlSetting::Software => write!(f, "software"),
        }
    }
}

/// Complete configuration for one inference session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial port path (e.g., /dev/ttyUSB1, COM3)
    pub port: String,
    pub baud_rate: u32,
    /// Total wait for the two response bytes
    pub timeout_ms: u64,
    /// Pause after each input byte
    pub byte_delay_ms: u64,
    /// Pause after the command marker before reading
    pub settle_ms: u64,
    /// Wait after opening the port while the board comes out of reset
    pub open_delay_ms: u64,
    pub flow_control: FlowControlSetting,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD,
            timeout_ms: 1000,
            byte_delay_ms: 10,
            settle_ms: 100,
            open_delay_ms: 100,
            flow_control: FlowControlSetting::None,
        }
    }
}

/// Partial configuration from a file or the command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub byte_delay_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub open_delay_ms: Option<u64>,
    pub flow_control: Option<FlowControlSetting>,
}

/// Configuration loading or validation failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to render config")]
    Render(#[from] toml::ser::Error),

    #[error("serial port path is empty")]
    EmptyPort,

    #[error("baud rate must be greater than zero")]
    ZeroBaudRate,

    #[error("read timeout must be greater than zero")]
    ZeroTimeout,
}

impl ConfigOverrides {
    /// Load overrides from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl LinkConfig {
    /// Defaults overlaid with the contents of a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply(ConfigOverrides::load(path)?);
        config.validate()?;
        Ok(config)
    }

    /// Overwrite every field the overrides set
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.baud_rate = baud_rate;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(byte_delay_ms) = overrides.byte_delay_ms {
            self.byte_delay_ms = byte_delay_ms;
        }
        if let Some(settle_ms) = overrides.settle_ms {
            self.settle_ms = settle_ms;
        }
        if let Some(open_delay_ms) = overrides.open_delay_ms {
            self.open_delay_ms = open_delay_ms;
        }
        if let Some(flow_control) = overrides.flow_control {
            self.flow_control = flow_control;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::EmptyPort);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Wait between opening the port and the first input byte. Independent of
    /// flow control: the board resets on open regardless of RTS/CTS.
    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }

    /// Transaction timing derived from this configuration
    pub fn pacing(&self) -> Pacing {
        Pacing {
            byte_delay: Duration::from_millis(self.byte_delay_ms),
            settle: Duration::from_millis(self.settle_ms),
            read_timeout: self.read_timeout(),
        }
    }

    /// Render as a TOML config file
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
