//! Outbound email alerts.
//!
//! [`EmailAlertSystem`] implements the core `NotificationSender` trait: it composes
//! messages and hands them to a [`MailTransport`]. Transport failures are logged and
//! reported as `false`, never raised.

mod email;
mod message;
mod transport;

pub use email::{format_amount, EmailAlertSystem};
pub use message::{ContentType, EmailMessage};
pub use transport::{MailTransport, OutboxTransport};

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode message: {0}")]
    Encode(String),
    #[error("transport rejected message: {0}")]
    Rejected(String),
}
