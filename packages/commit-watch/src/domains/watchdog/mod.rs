//! Transaction watchdog.
//!
//! Tracks transactions announced on the control topic and fires the completion
//! callback for any that miss their deadline.

pub mod actor;
pub mod events;
pub mod registry;
pub mod service;

use std::time::Duration;

use crate::config::DEFAULT_TRANSACTION_TIMEOUT;

pub use actor::{Watchdog, WatchdogError, WatchdogHandle};
pub use events::ControlSignal;
pub use registry::{CancelHandle, TransactionEntry, TransactionRegistry};
pub use service::WatchdogService;

/// What happens to live transactions when the watchdog shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Retire pending transactions without invoking their callbacks
    #[default]
    DropPending,
    /// Invoke the callback of every pending transaction before exiting
    FirePending,
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub control_topic: String,
    pub group: Option<String>,
    /// Deadline applied to every transaction
    pub timeout: Duration,
    pub shutdown_policy: ShutdownPolicy,
    /// Bound of the control mailbox. The consumer waits when it is full.
    pub mailbox_capacity: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            control_topic: "control".to_string(),
            group: None,
            timeout: DEFAULT_TRANSACTION_TIMEOUT,
            shutdown_policy: ShutdownPolicy::default(),
            mailbox_capacity: 1000,
        }
    }
}
