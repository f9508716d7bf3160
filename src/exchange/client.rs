//! Single-transaction inference client
//!
//! Writes the input bytes one at a time, sends the command marker, then waits
//! for the fixed-size reply. The pacing delays stand in for flow control the
//! firmware does not provide: the microcontroller cannot absorb a burst of
//! bytes faster than it consumes them. With RTS/CTS enabled they can be zero,
//! but the byte order must stay inputs-then-marker.

use super::error::ExchangeError;
use super::frame::{InputVector, OutputVector, COMMAND_MARKER, OUTPUT_LEN};
use log::{debug, warn};
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

/// Default delay between input bytes
pub const DEFAULT_BYTE_DELAY: Duration = Duration::from_millis(10);

/// Default delay after the command marker before reading
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Default total wait for the reply
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A byte-oriented link to the inference device
pub trait DeviceLink: Read + Write {
    /// Bound how long the next `read` may block
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

/// Timing of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after each input byte
    pub byte_delay: Duration,
    /// Pause after the command marker before reading
    pub settle: Duration,
    /// Total time allowed for the reply to arrive
    pub read_timeout: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            byte_delay: DEFAULT_BYTE_DELAY,
            settle: DEFAULT_SETTLE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Run one inference transaction over an open link.
///
/// Returns `Ok(None)` when fewer than two bytes arrive before the read
/// timeout. Never reads more than two bytes; anything extra the device sends
/// stays in the link's receive buffer. No retries are attempted.
pub fn run_inference<L: DeviceLink + ?Sized>(
    link: &mut L,
    inputs: &InputVector,
    pacing: &Pacing,
) -> Result<Option<OutputVector>, ExchangeError> {
    send_inputs(link, inputs, pacing)?;
    read_output(link, pacing.read_timeout)
}

fn send_inputs<L: DeviceLink + ?Sized>(
    link: &mut L,
    inputs: &InputVector,
    pacing: &Pacing,
) -> Result<(), ExchangeError> {
    for (i, byte) in inputs.as_bytes().iter().enumerate() {
        write_byte(link, *byte, "input byte")?;
        debug!("TX input[{}] = {}", i, byte);
        pause(pacing.byte_delay);
    }

    write_byte(link, COMMAND_MARKER, "command marker")?;
    debug!("TX command marker 0x{:02x}", COMMAND_MARKER);
    pause(pacing.settle);

    Ok(())
}

fn write_byte<L: DeviceLink + ?Sized>(
    link: &mut L,
    byte: u8,
    what: &'static str,
) -> Result<(), ExchangeError> {
    link.write_all(&[byte])
        .and_then(|_| link.flush())
        .map_err(|source| ExchangeError::Write { what, source })
}

fn read_output<L: DeviceLink + ?Sized>(
    link: &mut L,
    timeout: Duration,
) -> Result<Option<OutputVector>, ExchangeError> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; OUTPUT_LEN];
    let mut filled = 0;

    while filled < OUTPUT_LEN {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        link.set_read_timeout(remaining)
            .map_err(ExchangeError::Timeout)?;

        match link.read(&mut buf[filled..]) {
            // EOF: the device side went away
            Ok(0) => break,
            Ok(n) => {
                debug!("RX {:02x?}", &buf[filled..filled + n]);
                filled += n;
            }
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExchangeError::Read(e)),
        }
    }

    if filled == OUTPUT_LEN {
        Ok(Some(OutputVector::new(buf)))
    } else {
        warn!(
            "Expected {} response bytes, received {} before timeout",
            OUTPUT_LEN, filled
        );
        Ok(None)
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
