// Trait definitions for the collaborators the engines call out to
//
// These are INFRASTRUCTURE traits only. The watchdog decides *when* a callback
// fires and the validation engine decides *whether* a consequence is due; the
// implementations only perform the side effect.
//
// Naming convention: Base* for trait names (e.g., BaseCompletionCallback)

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::domains::validation::ConsequenceKind;

// =============================================================================
// Completion Callback Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseCompletionCallback: Send + Sync {
    /// Perform the follow-up for a transaction that missed its deadline
    async fn invoke(&self, callback_path: &str) -> Result<()>;
}

// =============================================================================
// Consequence Dispatcher Trait (Infrastructure)
// =============================================================================

/// Everything a consequence transport needs to notify about a failed payload
#[derive(Debug, Clone, PartialEq)]
pub struct ConsequenceNotice {
    pub kind: ConsequenceKind,
    /// E-mail address or API endpoint
    pub endpoint: String,
    pub template: Option<String>,
    pub topic: String,
    pub key: Bytes,
    /// The payload exactly as read from the broker
    pub payload: Bytes,
    /// Why the payload failed validation
    pub reason: String,
}

#[async_trait]
pub trait BaseConsequenceDispatcher: Send + Sync {
    /// Notify about a payload that failed validation
    async fn dispatch(&self, notice: &ConsequenceNotice) -> Result<()>;
}
