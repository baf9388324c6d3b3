// src/notify/mod.rs
//! Outbound reminder texts.

pub mod log;
pub mod twilio;

use std::sync::Mutex;

use crate::error::SendError;

pub use log::LogSender;
pub use twilio::TwilioSender;

/// What the provider handed back for a delivered message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub provider_id: Option<String>,
}

#[async_trait::async_trait]
pub trait TextSender: Send + Sync {
    /// Deliver `body` to the configured recipient. `Ok` means the provider
    /// accepted it; only then may the caller advance its watermark.
    async fn send(&self, body: &str) -> Result<Delivery, SendError>;
}

// --- Test helpers ---

/// Records every message and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().expect("sender mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl TextSender for RecordingSender {
    async fn send(&self, body: &str) -> Result<Delivery, SendError> {
        let mut g = self.sent.lock().expect("sender mutex poisoned");
        g.push(body.to_string());
        Ok(Delivery {
            provider_id: Some(format!("test-{}", g.len())),
        })
    }
}

/// Rejects every message, counting attempts.
#[derive(Debug, Default)]
pub struct FailingSender {
    pub attempts: Mutex<usize>,
}

#[async_trait::async_trait]
impl TextSender for FailingSender {
    async fn send(&self, _body: &str) -> Result<Delivery, SendError> {
        *self.attempts.lock().expect("sender mutex poisoned") += 1;
        Err(SendError::Rejected {
            status: 503,
            body: "provider unavailable".into(),
        })
    }
}
