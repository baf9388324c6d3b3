// src/notify/log.rs
use super::{Delivery, TextSender};
use crate::error::SendError;

/// Dry-run sender (`TEXT_DRY_RUN=1`): logs instead of texting.
#[derive(Debug, Clone, Default)]
pub struct LogSender;

#[async_trait::async_trait]
impl TextSender for LogSender {
    async fn send(&self, body: &str) -> Result<Delivery, SendError> {
        tracing::info!(target: "notify", message = body, "dry run: text not delivered");
        Ok(Delivery::default())
    }
}
