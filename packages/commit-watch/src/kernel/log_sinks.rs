//! Logging-only collaborators.
//!
//! The real notification transports live outside this crate. These sinks
//! record what would have been sent, which is all the binaries do today.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use super::traits::{BaseCompletionCallback, BaseConsequenceDispatcher, ConsequenceNotice};
use crate::domains::validation::ConsequenceKind;

/// Completion callback that only logs the callback path.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCompletionCallback;

#[async_trait]
impl BaseCompletionCallback for LoggingCompletionCallback {
    async fn invoke(&self, callback_path: &str) -> Result<()> {
        info!(callback_path = %callback_path, "callback initiated");
        Ok(())
    }
}

/// Consequence dispatcher that only logs the notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConsequenceDispatcher;

#[async_trait]
impl BaseConsequenceDispatcher for LoggingConsequenceDispatcher {
    async fn dispatch(&self, notice: &ConsequenceNotice) -> Result<()> {
        let payload = String::from_utf8_lossy(&notice.payload);

        match notice.kind {
            ConsequenceKind::Email => warn!(
                topic = %notice.topic,
                endpoint = %notice.endpoint,
                template = notice.template.as_deref().unwrap_or_default(),
                reason = %notice.reason,
                payload = %payload,
                "email consequence"
            ),
            ConsequenceKind::ApiCall => warn!(
                topic = %notice.topic,
                endpoint = %notice.endpoint,
                reason = %notice.reason,
                payload = %payload,
                "api call consequence"
            ),
        }

        Ok(())
    }
}
