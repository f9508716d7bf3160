//! Wire frame definitions for the inference exchange
//!
//! A transaction is `[in0, in1, in2, in3, b'I']` host to device, answered by
//! `[out0, out1]` device to host. There is no length prefix, checksum or
//! escaping; the firmware frames by counting bytes.

use std::fmt;
use std::str::FromStr;

/// Number of input bytes the firmware consumes per transaction
pub const INPUT_LEN: usize = 4;

/// Number of output bytes the firmware replies with
pub const OUTPUT_LEN: usize = 2;

/// Command byte telling the device to run inference on the buffered inputs
pub const COMMAND_MARKER: u8 = b'I';

/// Total bytes sent host to device per transaction
pub const FRAME_LEN: usize = INPUT_LEN + 1;

/// Inputs for a single inference run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputVector([u8; INPUT_LEN]);

impl InputVector {
    pub const fn new(bytes: [u8; INPUT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; INPUT_LEN] {
        &self.0
    }

    /// The full host-to-device frame, inputs followed by the command marker
    pub fn frame(&self) -> [u8; FRAME_LEN] {
        let mut frame = [COMMAND_MARKER; FRAME_LEN];
        frame[..INPUT_LEN].copy_from_slice(&self.0);
        frame
    }
}

impl From<[u8; INPUT_LEN]> for InputVector {
    fn from(bytes: [u8; INPUT_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for InputVector {
    type Error = InputError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; INPUT_LEN] = bytes
            .try_into()
            .map_err(|_| InputError::WrongLength(bytes.len()))?;
        Ok(Self(array))
    }
}

/// Parses `"100,50,200,30"` (whitespace around values is ignored)
impl FromStr for InputVector {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<u8>()
                    .map_err(|_| InputError::OutOfRange(part.to_string()))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::try_from(values.as_slice())
    }
}

impl fmt::Display for InputVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_byte_list(f, &self.0)
    }
}

/// Bytes returned by the device for one inference run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputVector([u8; OUTPUT_LEN]);

impl OutputVector {
    pub const fn new(bytes: [u8; OUTPUT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OUTPUT_LEN] {
        &self.0
    }
}

impl fmt::Display for OutputVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_byte_list(f, &self.0)
    }
}

/// Rejected input vector
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("expected 4 input values, got {0}")]
    WrongLength(usize),

    #[error("input value '{0}' is not an integer in 0-255")]
    OutOfRange(String),
}

/// Line printed for the outcome of a transaction
pub fn describe_response(output: Option<&OutputVector>) -> String {
    match output {
        Some(out) => format!("Output: {}", out),
        None => "No response".to_string(),
    }
}

fn write_byte_list(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "[")?;
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", b)?;
    }
    write!(f, "]")
}
