use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

use super::{DeliveryFailure, EmailMessage};

/// Hands a composed message to whatever actually delivers mail.
pub trait MailTransport {
    fn deliver(&self, message: &EmailMessage) -> Result<(), DeliveryFailure>;
}

impl<T: MailTransport + ?Sized> MailTransport for &T {
    fn deliver(&self, message: &EmailMessage) -> Result<(), DeliveryFailure> {
        (**self).deliver(message)
    }
}

/// Appends each message as one JSON line to an outbox file; a mail relay drains it.
#[derive(Debug)]
pub struct OutboxTransport {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl OutboxTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Messages currently queued, oldest first.
    pub fn read_all(&self) -> Result<Vec<EmailMessage>, DeliveryFailure> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        fs::read_to_string(&self.path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|err| DeliveryFailure::Encode(err.to_string()))
            })
            .collect()
    }
}

impl MailTransport for OutboxTransport {
    fn deliver(&self, message: &EmailMessage) -> Result<(), DeliveryFailure> {
        let mut line =
            serde_json::to_string(message).map_err(|err| DeliveryFailure::Encode(err.to_string()))?;
        line.push('\n');

        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| DeliveryFailure::Rejected("outbox lock poisoned".into()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
