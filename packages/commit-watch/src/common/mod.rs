// Common types shared across domains

pub mod id;

pub use id::TransactionId;
