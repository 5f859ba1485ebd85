//! Stable string ids for ephemeral automation handles.
//!
//! Clients cannot hold automation objects across invocations, so every element
//! the service hands out is registered here under an opaque id. Entries are
//! non-owning: the provider decides whether a handle is still valid, and an id
//! whose handle fails [`LivenessProbe::is_alive`] is evicted the next time it is
//! looked up.

use crate::automation::{ElementHandle, LivenessProbe};
use std::collections::HashMap;

/// Bidirectional id ↔ handle map.
///
/// Ids come from a counter that is never reset, so an id is never reissued for
/// a different element within one service process, even across `clear`.
#[derive(Debug, Default)]
pub struct IdentityCache {
    by_id: HashMap<String, ElementHandle>,
    by_handle: HashMap<ElementHandle, String>,
    issued: u64,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `handle`, registering it if needed.
    pub fn get_or_create_id(&mut self, handle: &ElementHandle) -> String {
        if let Some(id) = self.by_handle.get(handle) {
            return id.clone();
        }
        self.issued += 1;
        let id = format!("e{}", self.issued);
        self.by_id.insert(id.clone(), handle.clone());
        self.by_handle.insert(handle.clone(), id.clone());
        id
    }

    /// Looks up `id` and verifies the handle is still alive.
    ///
    /// Returns `None` for unknown ids and for ids whose handle went stale; the
    /// latter are evicted.
    pub async fn resolve<P>(&mut self, id: &str, probe: &P) -> Option<ElementHandle>
    where
        P: LivenessProbe + ?Sized,
    {
        let handle = self.by_id.get(id)?.clone();
        if probe.is_alive(&handle).await {
            Some(handle)
        } else {
            tracing::debug!(id, "evicting stale element id");
            self.evict(id);
            None
        }
    }

    pub fn evict(&mut self, id: &str) -> bool {
        match self.by_id.remove(id) {
            Some(handle) => {
                self.by_handle.remove(&handle);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_handle.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/identity_cache_tests.rs"]
mod tests;
