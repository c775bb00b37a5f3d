use std::collections::VecDeque;
use std::path::PathBuf;

use log::warn;
use uuid::Uuid;

use super::convert::ConversionSummary;

/// A finished conversion waiting to be claimed by its caller.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    /// Path of the rectangular output produced by the conversion.
    pub output_path: PathBuf,
    /// Shape and timing details of the conversion.
    pub summary: ConversionSummary,
}

/// Bounded, uuid-keyed store for finished conversions.
///
/// Entries are claimed with [`take`](SessionStore::take), which removes them,
/// so a download can only be served once. When the store is full the oldest
/// entry is evicted first; the eviction is logged because the evicted output
/// file becomes unreachable through the store.
pub struct SessionStore {
    capacity: usize,
    entries: VecDeque<(Uuid, SessionEntry)>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Stores a finished conversion under its summary id, evicting the
    /// oldest entry when the store is at capacity.
    ///
    /// # Returns
    ///
    /// The id the entry is stored under.
    pub fn insert(&mut self, entry: SessionEntry) -> Uuid {
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.pop_front() {
                warn!("session store full, evicting oldest session {evicted}");
            }
        }
        let id = entry.summary.id;
        self.entries.push_back((id, entry));
        id
    }

    /// Claims and removes the entry for `id`.
    pub fn take(&mut self, id: &Uuid) -> Option<SessionEntry> {
        let position = self.entries.iter().position(|(key, _)| key == id)?;
        self.entries.remove(position).map(|(_, entry)| entry)
    }

    /// Removes the entry for `id` without claiming it.
    pub fn evict(&mut self, id: &Uuid) -> bool {
        let position = self.entries.iter().position(|(key, _)| key == id);
        match position {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.iter().any(|(key, _)| key == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
