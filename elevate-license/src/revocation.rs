//! Revocation lists.
//!
//! License keys are self-describing, so nothing short of an external list can
//! invalidate one before it expires. A key is identified by its hex signature
//! segment, which is unique per issued key.

use std::collections::HashSet;
use std::sync::RwLock;

/// A source of revoked key ids consulted during validation.
pub trait RevocationList: Send + Sync {
    /// Returns true if the key id has been revoked.
    fn is_revoked(&self, key_id: &str) -> bool;
}

/// Process-local revocation list. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryRevocationList {
    revoked: RwLock<HashSet<String>>,
}

impl MemoryRevocationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes a key id. Returns false if it was already revoked.
    pub fn revoke(&self, key_id: impl Into<String>) -> bool {
        self.revoked
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key_id.into())
    }

    /// Lifts a revocation. Returns false if the key id was not revoked.
    pub fn restore(&self, key_id: &str) -> bool {
        self.revoked
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key_id)
    }

    pub fn len(&self) -> usize {
        self.revoked.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RevocationList for MemoryRevocationList {
    fn is_revoked(&self, key_id: &str) -> bool {
        self.revoked
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key_id)
    }
}
