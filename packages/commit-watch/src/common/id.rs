//! Transaction identifiers.
//!
//! A transaction is addressed by the key of its control messages. The ingestion
//! front end generates UUIDs, but the watchdog treats the key as opaque bytes
//! so that any producer keyed by bytes can participate.

use std::borrow::Borrow;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use bytes::Bytes;

/// Identifier of a logical transaction, taken from a control message key.
///
/// Equality and hashing use the raw key bytes. Text is only produced for logs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionId(Bytes);

impl TransactionId {
    pub fn new(id: impl Into<Bytes>) -> Self {
        Self(id.into())
    }

    /// Builds an id from a raw message key without copying it.
    pub fn from_key(key: &Bytes) -> Self {
        Self(key.clone())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Must agree with the `[u8]` hash for `Borrow<[u8]>` lookups.
impl Hash for TransactionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

/// Lossy rendering. Keys that are not UTF-8 show replacement characters.
impl Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl Borrow<[u8]> for TransactionId {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for TransactionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(id: &str) -> Self {
        Self(Bytes::copy_from_slice(id.as_bytes()))
    }
}

impl From<String> for TransactionId {
    fn from(id: String) -> Self {
        Self(Bytes::from(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_key_utf8() {
        let key = Bytes::from_static(b"0b6c4e0e-6f52-4e8e-9d5f-3d1f0f0a2c11");
        let id = TransactionId::from_key(&key);
        assert_eq!(id.to_string(), "0b6c4e0e-6f52-4e8e-9d5f-3d1f0f0a2c11");
        assert_eq!(id, TransactionId::from("0b6c4e0e-6f52-4e8e-9d5f-3d1f0f0a2c11"));
        assert!(!id.is_empty());
    }

    #[test]
    fn test_invalid_utf8_keys_stay_distinct() {
        let a = TransactionId::from_key(&Bytes::from_static(&[0xff]));
        let b = TransactionId::from_key(&Bytes::from_static(&[0xfe]));

        // Both render the same, but they are different transactions
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);

        let mut map = HashMap::new();
        map.insert(a, "/a");
        map.insert(b, "/b");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_display_is_lossy() {
        let id = TransactionId::from_key(&Bytes::from_static(&[b'a', 0xff, b'b']));
        assert_eq!(id.to_string(), "a\u{fffd}b");
    }

    #[test]
    fn test_empty_key() {
        assert!(TransactionId::from_key(&Bytes::new()).is_empty());
    }

    #[test]
    fn test_lookup_by_bytes() {
        let mut map = HashMap::new();
        map.insert(TransactionId::from("tx-1"), 1);
        assert_eq!(map.get(b"tx-1".as_slice()), Some(&1));
    }
}
