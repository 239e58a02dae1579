// Test dependencies - recording mocks of the engine collaborators
//
// Inject these where the binaries use the logging sinks to assert on what the
// engines decided.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::traits::{BaseCompletionCallback, BaseConsequenceDispatcher, ConsequenceNotice};

// =============================================================================
// Mock Completion Callback
// =============================================================================

/// Records every callback path it is invoked with.
#[derive(Clone, Default)]
pub struct TestCompletionCallback {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<AtomicBool>,
}

impl TestCompletionCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation return an error (after recording it)
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Get all callback paths, in invocation order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of invocations for one callback path
    pub fn calls_for(&self, callback_path: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|p| p.as_str() == callback_path)
            .count()
    }
}

#[async_trait]
impl BaseCompletionCallback for TestCompletionCallback {
    async fn invoke(&self, callback_path: &str) -> Result<()> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(callback_path.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("callback endpoint unavailable"));
        }
        Ok(())
    }
}

// =============================================================================
// Mock Consequence Dispatcher
// =============================================================================

/// Records every consequence notice it receives.
#[derive(Clone, Default)]
pub struct TestConsequenceDispatcher {
    notices: Arc<Mutex<Vec<ConsequenceNotice>>>,
    failing: Arc<AtomicBool>,
}

impl TestConsequenceDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every dispatch return an error (after recording it)
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn notices(&self) -> Vec<ConsequenceNotice> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Notices dispatched for payloads read from one topic
    pub fn notices_for_topic(&self, topic: &str) -> Vec<ConsequenceNotice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|n| n.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BaseConsequenceDispatcher for TestConsequenceDispatcher {
    async fn dispatch(&self, notice: &ConsequenceNotice) -> Result<()> {
        self.notices.lock().unwrap_or_else(|e| e.into_inner()).push(notice.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("mail relay unavailable"));
        }
        Ok(())
    }
}
