//! Inference exchange with the serial-attached MLP device
//!
//! This module provides:
//! - The wire frame (four input bytes, the `I` command marker, two output bytes)
//! - A single-transaction client generic over any [`DeviceLink`]
//! - Pacing for devices without hardware flow control

pub mod client;
pub mod error;
pub mod frame;
#[cfg(test)]
mod mock;

pub use client::{run_inference, DeviceLink, Pacing};
pub use error::ExchangeError;
pub use frame::{describe_response, InputVector, OutputVector};
