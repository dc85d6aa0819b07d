//! Time-bounded id sets

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A set of ids that forget themselves after a fixed time-to-live
#[derive(Debug, Clone)]
pub struct ExpiringSet {
    ttl: Duration,
    entries: HashMap<String, Instant>,
}

impl ExpiringSet {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Insert or refresh an id
    pub fn insert(&mut self, id: impl Into<String>) {
        self.prune();
        self.entries.insert(id.into(), Instant::now());
    }

    /// Whether the id was inserted less than one TTL ago
    pub fn contains(&self, id: &str) -> bool {
        self.entries
            .get(id)
            .is_some_and(|inserted| inserted.elapsed() < self.ttl)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Drop expired entries
    pub fn prune(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, inserted| inserted.elapsed() < ttl);
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|inserted| inserted.elapsed() < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
