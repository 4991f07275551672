//! Identity cache of objects keyed by id.
//!
//! Invalidated dynamic objects stay strongly reachable for a grace period so
//! that late notifications can still resolve them. A sweep past the grace
//! period downgrades them to weak references: they remain resolvable while
//! anyone else holds them and are reclaimed afterwards.

use crate::ids::ObjectId;
use crate::object::SystemObject;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

pub const DEFAULT_GRACE_PERIOD_SECONDS: i64 = 60;

#[derive(Debug, Clone)]
enum ArenaEntry {
    Live(Arc<SystemObject>),
    Retiring {
        object: Arc<SystemObject>,
        since: DateTime<Utc>,
    },
    Reclaimable(Weak<SystemObject>),
}

#[derive(Debug, Clone)]
pub struct ObjectArena {
    entries: BTreeMap<ObjectId, ArenaEntry>,
    grace: Duration,
}

impl Default for ObjectArena {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_GRACE_PERIOD_SECONDS))
    }
}

impl ObjectArena {
    pub fn new(grace: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            grace,
        }
    }

    /// Insert a live object. An existing entry for the id is kept.
    ///
    /// Returns `false` when the id was already taken.
    pub fn insert(&mut self, object: Arc<SystemObject>) -> bool {
        if let Some(existing) = self.entries.get(&object.id)
            && !matches!(existing, ArenaEntry::Reclaimable(weak) if weak.strong_count() == 0)
        {
            return false;
        }
        self.entries.insert(object.id, ArenaEntry::Live(object));
        true
    }

    /// Replace the entry for `object.id`, keeping its lifecycle state.
    pub fn replace(&mut self, object: Arc<SystemObject>) {
        let id = object.id;
        let entry = match self.entries.remove(&id) {
            Some(ArenaEntry::Retiring { since, .. }) => ArenaEntry::Retiring { object, since },
            _ => ArenaEntry::Live(object),
        };
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: ObjectId) -> Option<Arc<SystemObject>> {
        match self.entries.get(&id)? {
            ArenaEntry::Live(object) | ArenaEntry::Retiring { object, .. } => Some(object.clone()),
            ArenaEntry::Reclaimable(weak) => weak.upgrade(),
        }
    }

    /// Start the grace period of an invalidated object.
    pub fn retire(&mut self, id: ObjectId, at: DateTime<Utc>) -> bool {
        match self.entries.remove(&id) {
            Some(ArenaEntry::Live(object)) => {
                self.entries
                    .insert(id, ArenaEntry::Retiring { object, since: at });
                true
            }
            Some(other) => {
                self.entries.insert(id, other);
                false
            }
            None => false,
        }
    }

    /// Downgrade retiring entries whose grace period ended before `now` and
    /// drop weak entries nobody holds anymore. Returns the downgraded ids.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<ObjectId> {
        let mut downgraded = Vec::new();
        let mut dead = Vec::new();
        for (id, entry) in &mut self.entries {
            match entry {
                ArenaEntry::Retiring { object, since } if *since + self.grace <= now => {
                    let weak = Arc::downgrade(object);
                    *entry = ArenaEntry::Reclaimable(weak);
                    downgraded.push(*id);
                }
                ArenaEntry::Reclaimable(weak) if weak.strong_count() == 0 => dead.push(*id),
                _ => {}
            }
        }
        for id in dead {
            self.entries.remove(&id);
        }
        downgraded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
