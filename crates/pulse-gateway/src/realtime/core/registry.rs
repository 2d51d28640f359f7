use std::collections::HashMap;

use pulse_core::protocol::event::PresenceEntry;

use crate::realtime::types::{ConnId, ConnectionHandle};

/// One online identity bound to the connection that announced it.
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    pub user_id: String,
    pub conn: ConnectionHandle,
}

/// Result of a `register` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// New record appended.
    Registered,
    /// Identity already owned by a live connection; nothing changed.
    AlreadyOnline,
    /// Empty identity; nothing changed.
    Ignored,
}

impl Registration {
    pub fn as_str(self) -> &'static str {
        match self {
            Registration::Registered => "registered",
            Registration::AlreadyOnline => "already_online",
            Registration::Ignored => "ignored",
        }
    }
}

/// Presence registry: `user_id -> connection`, at most one route per identity.
///
/// - Records keep insertion order for snapshots.
/// - `index` maps identity to position in `records` and is rebuilt on removal.
/// - The first connection to announce an identity owns it until that
///   connection is removed; later announcements are ignored, not rebound.
/// - Identities are stored and looked up with surrounding whitespace trimmed.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    records: Vec<PresenceRecord>,
    index: HashMap<String, usize>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, user_id: &str, conn: &ConnectionHandle) -> Registration {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Registration::Ignored;
        }
        if self.index.contains_key(user_id) {
            return Registration::AlreadyOnline;
        }
        self.index.insert(user_id.to_string(), self.records.len());
        self.records.push(PresenceRecord {
            user_id: user_id.to_string(),
            conn: conn.clone(),
        });
        Registration::Registered
    }

    /// Drop every record bound to `conn`. Returns the identities that went offline.
    pub fn remove(&mut self, conn: ConnId) -> Vec<String> {
        let mut removed = Vec::new();
        self.records.retain(|r| {
            if r.conn.id() == conn {
                removed.push(r.user_id.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.reindex();
        }
        removed
    }

    pub fn lookup(&self, user_id: &str) -> Option<&PresenceRecord> {
        self.index.get(user_id.trim()).and_then(|&i| self.records.get(i))
    }

    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        self.records
            .iter()
            .map(|r| PresenceEntry {
                user_id: r.user_id.clone(),
                socket_id: r.conn.socket_id(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, r) in self.records.iter().enumerate() {
            self.index.insert(r.user_id.clone(), i);
        }
    }
}
