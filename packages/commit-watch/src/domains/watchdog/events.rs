use tokio::sync::oneshot;

use crate::common::TransactionId;
use crate::kernel::BrokerMessage;

/// Signals carried by control-topic messages.
///
/// A non-empty value announces a transaction and carries its callback path.
/// An empty value marks the transaction complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlSignal {
    Start {
        transaction_id: TransactionId,
        callback_path: String,
    },
    Complete {
        transaction_id: TransactionId,
    },
}

impl ControlSignal {
    /// Decode a control message. Returns `None` when the message has no key,
    /// since there is no transaction it could address.
    pub fn from_message(message: &BrokerMessage) -> Option<Self> {
        let transaction_id = TransactionId::from_key(&message.key);
        if transaction_id.is_empty() {
            return None;
        }

        if message.value.is_empty() {
            Some(ControlSignal::Complete { transaction_id })
        } else {
            Some(ControlSignal::Start {
                transaction_id,
                callback_path: String::from_utf8_lossy(&message.value).into_owned(),
            })
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        match self {
            ControlSignal::Start { transaction_id, .. }
            | ControlSignal::Complete { transaction_id } => transaction_id,
        }
    }
}

/// Requests delivered to the watchdog actor, in the order they were sent.
#[derive(Debug)]
pub(crate) enum ControlEvent {
    Enqueue {
        transaction_id: TransactionId,
        callback_path: String,
    },
    Dequeue {
        transaction_id: TransactionId,
    },
    LiveCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Sent by a timer task when its deadline elapses.
#[derive(Debug)]
pub(crate) struct TimerExpired {
    pub transaction_id: TransactionId,
    pub generation: u64,
}
