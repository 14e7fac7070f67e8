//! Caller to on-chain address mapping.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// In-memory map from chat caller id to a registered wallet address.
///
/// Writes are serialized by the lock. Concurrent registrations for the same
/// caller resolve to whichever write acquires the lock last. Entries live for
/// the lifetime of the process.
#[derive(Clone, Default)]
pub struct AddressBook {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `address` for `caller`, returning the address it replaced.
    pub async fn register(&self, caller: &str, address: &str) -> Option<String> {
        let previous = self
            .entries
            .write()
            .await
            .insert(caller.to_string(), address.to_string());
        tracing::debug!(caller, replaced = previous.is_some(), "Registered address");
        previous
    }

    pub async fn lookup(&self, caller: &str) -> Option<String> {
        self.entries.read().await.get(caller).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
