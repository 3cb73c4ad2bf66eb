//! Errors surfaced to callers of the headset.

use crate::commands::SIDETONE_MAX;

/// Errors that can occur when commanding the headset.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The headset is not connected to the receiver.
    #[error("headset is not connected")]
    NotAttached,

    /// The alert id is not one the headset knows.
    #[error("invalid alert {0}, expected 0 or 1")]
    InvalidAlert(u8),

    /// The sidetone level is out of range.
    #[error("invalid sidetone level {0}, expected at most {max}", max = SIDETONE_MAX)]
    InvalidSidetone(u8),

    /// Sending the command failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A failed write to the receiver.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to send report {report_id:#04x}: {reason}")]
pub struct TransportError {
    /// The report that could not be sent.
    pub report_id: u8,
    /// Why it could not be sent.
    pub reason: String,
}

impl TransportError {
    /// Creates a new transport error for the given report.
    pub fn new(report_id: u8, reason: impl ToString) -> Self {
        Self {
            report_id,
            reason: reason.to_string(),
        }
    }
}
