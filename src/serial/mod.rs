//! Serial port access for the inference board
//!
//! This module provides functionality for:
//! - Opening the link with the configured baud rate, timeout and flow control
//! - Listing available serial ports (USB-to-serial adapters)

pub mod port;

pub use port::SerialConnection;
