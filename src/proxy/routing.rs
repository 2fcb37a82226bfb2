//! Acknowledgement routing
//!
//! Maps (group, topic, partition) to the event channel of the partition
//! session the last message for that key was consumed from, so that a later,
//! separate call can acknowledge it.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::broker::EventSender;

const INIT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    pub group: String,
    pub topic: String,
    pub partition: i32,
}

impl RoutingKey {
    pub fn new(group: &str, topic: &str, partition: i32) -> Self {
        Self {
            group: group.to_string(),
            topic: topic.to_string(),
            partition,
        }
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.topic, self.partition)
    }
}

/// Routing entries are never removed. A new session for a key replaces the
/// previous one, so the table is bounded by the number of distinct
/// group/topic/partition combinations ever consumed.
pub struct RoutingTable {
    entries: RwLock<HashMap<RoutingKey, EventSender>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(INIT_CAPACITY)),
        }
    }

    /// Record the session for `key`, replacing any previous one.
    pub fn insert(&self, key: RoutingKey, events: EventSender) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, events);
    }

    pub fn get(&self, key: &RoutingKey) -> Option<EventSender> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
