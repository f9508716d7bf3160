//! Exchange error types

use std::io;

/// Fatal failure of an inference transaction
///
/// A short or missing reply is not an error; it surfaces as `Ok(None)` from
/// [`run_inference`](super::run_inference).
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Writing an input byte or the command marker failed. The link state is
    /// undefined afterwards and should be reopened.
    #[error("failed to write {what} to device")]
    Write {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to read response from device")]
    Read(#[source] io::Error),

    #[error("failed to set link read timeout")]
    Timeout(#[source] io::Error),
}
