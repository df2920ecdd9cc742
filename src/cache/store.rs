// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory index of the objects of one kind within one scope.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::trace;

use crate::constants::cache::MAX_TOMBSTONES;
use crate::types::{EventKind, ObjectKey, ObjectRecord, ResourceEvent, ResourceKind, Scope};

/// Namespace restriction for list requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceFilter {
    All,
    Namespace(String),
}

impl NamespaceFilter {
    fn matches(&self, key: &ObjectKey) -> bool {
        match self {
            NamespaceFilter::All => true,
            NamespaceFilter::Namespace(ns) => key.namespace.as_deref() == Some(ns.as_str()),
        }
    }
}

/// Records for one (kind, scope) pair.
///
/// Deleted objects are kept as payload-less tombstones so a late, older
/// update cannot bring them back. Tombstones are never returned by reads,
/// are dropped on the next full resync, and at most `tombstone_limit` are
/// kept in between, evicting the lowest resource version first.
#[derive(Debug)]
pub struct ScopedStore {
    kind: ResourceKind,
    scope: Scope,
    records: BTreeMap<ObjectKey, ObjectRecord>,
    tombstones: BTreeSet<(u64, ObjectKey)>,
    tombstone_limit: usize,
}

impl ScopedStore {
    pub fn new(kind: ResourceKind, scope: Scope) -> Self {
        Self {
            kind,
            scope,
            records: BTreeMap::new(),
            tombstones: BTreeSet::new(),
            tombstone_limit: MAX_TOMBSTONES,
        }
    }

    pub fn with_tombstone_limit(mut self, limit: usize) -> Self {
        self.tombstone_limit = limit;
        self
    }

    /// Apply an added or modified object. Returns the resulting event, or
    /// `None` when the record is stale or outside this store's scope.
    pub fn upsert(&mut self, record: ObjectRecord) -> Option<ResourceEvent> {
        if !self.admits(&record) {
            return None;
        }

        let event_kind = match self.records.get(&record.key) {
            Some(existing) if record.resource_version <= existing.resource_version => {
                trace!(
                    kind = %self.kind,
                    key = %record.key,
                    stored = existing.resource_version,
                    incoming = record.resource_version,
                    "Dropping stale update"
                );
                return None;
            }
            Some(existing) if !existing.deleted => EventKind::Updated,
            _ => EventKind::Added,
        };

        self.forget_tombstone(&record.key);
        let record = ObjectRecord {
            deleted: false,
            ..record
        };
        self.records.insert(record.key.clone(), record.clone());
        Some(ResourceEvent::new(event_kind, record))
    }

    /// Apply a deletion. Returns `None` when stale, out of scope, or when
    /// the object was not live. The returned event carries the final state.
    pub fn delete(&mut self, record: ObjectRecord) -> Option<ResourceEvent> {
        if !self.admits(&record) {
            return None;
        }

        let was_live = match self.records.get(&record.key) {
            Some(existing) if record.resource_version <= existing.resource_version => {
                trace!(kind = %self.kind, key = %record.key, "Dropping stale delete");
                return None;
            }
            Some(existing) => !existing.deleted,
            None => false,
        };

        self.forget_tombstone(&record.key);
        let deleted = record.into_tombstone();
        self.remember_tombstone(&deleted);
        was_live.then(|| ResourceEvent::new(EventKind::Deleted, deleted))
    }

    /// Replace the contents with a fresh listing and return the difference
    /// as events: new and changed objects first, then the ones that vanished.
    pub fn resync(&mut self, listed: Vec<ObjectRecord>) -> Vec<ResourceEvent> {
        let mut events = Vec::new();
        let mut present = BTreeSet::new();

        for record in listed {
            if !self.admits(&record) {
                continue;
            }
            present.insert(record.key.clone());
            if let Some(event) = self.upsert(record) {
                events.push(event);
            }
        }

        let vanished: Vec<ObjectKey> = self
            .records
            .keys()
            .filter(|key| !present.contains(*key))
            .cloned()
            .collect();

        for key in vanished {
            if let Some(record) = self.records.remove(&key) {
                if !record.deleted {
                    events.push(ResourceEvent::new(
                        EventKind::Deleted,
                        record.into_tombstone(),
                    ));
                }
            }
        }

        let records = &self.records;
        self.tombstones
            .retain(|(_, key)| records.get(key).is_some_and(|r| r.deleted));

        events
    }

    pub fn get(&self, key: &ObjectKey) -> Option<ObjectRecord> {
        self.records.get(key).filter(|r| !r.deleted).cloned()
    }

    /// Live records matching `filter`, ordered by namespace then name.
    pub fn list(&self, filter: &NamespaceFilter) -> Vec<ObjectRecord> {
        self.records
            .values()
            .filter(|r| !r.deleted && filter.matches(&r.key))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.values().filter(|r| !r.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn admits(&self, record: &ObjectRecord) -> bool {
        self.scope.admits(record.namespace())
    }

    /// Store only the identity and version of a deleted object.
    fn remember_tombstone(&mut self, deleted: &ObjectRecord) {
        let tombstone = ObjectRecord {
            key: deleted.key.clone(),
            resource_version: deleted.resource_version,
            deleted: true,
            payload: Value::Null,
        };
        self.tombstones
            .insert((tombstone.resource_version, tombstone.key.clone()));
        self.records.insert(tombstone.key.clone(), tombstone);

        while self.tombstones.len() > self.tombstone_limit {
            let Some((version, key)) = self.tombstones.pop_first() else {
                break;
            };
            trace!(kind = %self.kind, %key, version, "Evicting tombstone");
            self.records.remove(&key);
        }
    }

    fn forget_tombstone(&mut self, key: &ObjectKey) {
        if let Some(existing) = self.records.get(key).filter(|r| r.deleted) {
            self.tombstones
                .remove(&(existing.resource_version, key.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(scope: Scope) -> ScopedStore {
        ScopedStore::new(ResourceKind::new("enmasse.io", "v1beta1", "Address"), scope)
    }

    fn record(ns: &str, name: &str, rv: u64) -> ObjectRecord {
        ObjectRecord::new(
            ObjectKey::new(Some(ns), name),
            rv,
            json!({"metadata": {"name": name, "namespace": ns}, "rv": rv}),
        )
    }

    #[test]
    fn test_add_then_update() {
        let mut store = store(Scope::Cluster);

        let added = store.upsert(record("ns-a", "q1", 1)).unwrap();
        assert_eq!(added.kind, EventKind::Added);

        let updated = store.upsert(record("ns-a", "q1", 2)).unwrap();
        assert_eq!(updated.kind, EventKind::Updated);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_out_of_order_update_is_dropped() {
        let mut store = store(Scope::Cluster);

        store.upsert(record("ns-a", "q1", 1));
        store.upsert(record("ns-a", "q1", 3));
        assert!(store.upsert(record("ns-a", "q1", 2)).is_none());

        let key = ObjectKey::new(Some("ns-a"), "q1");
        assert_eq!(store.get(&key).unwrap().resource_version, 3);
    }

    #[test]
    fn test_duplicate_update_is_dropped() {
        let mut store = store(Scope::Cluster);

        store.upsert(record("ns-a", "q1", 5));
        assert!(store.upsert(record("ns-a", "q1", 5)).is_none());
    }

    #[test]
    fn test_out_of_scope_record_is_ignored() {
        let mut store = store(Scope::Namespace("ns-a".to_string()));

        assert!(store.upsert(record("ns-b", "q1", 1)).is_none());
        assert!(store.is_empty());
        assert!(store.list(&NamespaceFilter::All).is_empty());
    }

    #[test]
    fn test_delete_leaves_tombstone() {
        let mut store = store(Scope::Cluster);
        let key = ObjectKey::new(Some("ns-a"), "q1");

        store.upsert(record("ns-a", "q1", 1));
        let deleted = store.delete(record("ns-a", "q1", 4)).unwrap();
        assert_eq!(deleted.kind, EventKind::Deleted);
        assert!(deleted.record.deleted);
        assert!(store.get(&key).is_none());

        // An older update arriving after the delete must not resurrect the object
        assert!(store.upsert(record("ns-a", "q1", 3)).is_none());
        assert!(store.get(&key).is_none());

        let readded = store.upsert(record("ns-a", "q1", 5)).unwrap();
        assert_eq!(readded.kind, EventKind::Added);
    }

    #[test]
    fn test_delete_of_unknown_object_is_silent() {
        let mut store = store(Scope::Cluster);
        assert!(store.delete(record("ns-a", "q1", 2)).is_none());
        assert!(store.upsert(record("ns-a", "q1", 1)).is_none());
    }

    #[test]
    fn test_list_filters_and_orders() {
        let mut store = store(Scope::Cluster);
        store.upsert(record("ns-b", "b", 1));
        store.upsert(record("ns-a", "z", 2));
        store.upsert(record("ns-a", "a", 3));

        let all: Vec<String> = store
            .list(&NamespaceFilter::All)
            .iter()
            .map(|r| r.key.to_string())
            .collect();
        assert_eq!(all, vec!["ns-a/a", "ns-a/z", "ns-b/b"]);

        let only_b = store.list(&NamespaceFilter::Namespace("ns-b".to_string()));
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].name(), "b");
    }

    #[test]
    fn test_resync_emits_diff() {
        let mut store = store(Scope::Cluster);
        store.upsert(record("ns-a", "unchanged", 1));
        store.upsert(record("ns-a", "changed", 2));
        store.upsert(record("ns-a", "gone", 3));

        let events = store.resync(vec![
            record("ns-a", "unchanged", 1),
            record("ns-a", "changed", 7),
            record("ns-a", "new", 8),
        ]);

        let summary: Vec<(EventKind, String)> = events
            .iter()
            .map(|e| (e.kind, e.record.name().to_string()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (EventKind::Updated, "changed".to_string()),
                (EventKind::Added, "new".to_string()),
                (EventKind::Deleted, "gone".to_string()),
            ]
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_resync_purges_tombstones() {
        let mut store = store(Scope::Cluster);
        store.upsert(record("ns-a", "q1", 1));
        store.delete(record("ns-a", "q1", 2));

        let events = store.resync(vec![]);
        assert!(events.is_empty());

        // After the relist the key is unknown, so any version is accepted again
        assert!(store.upsert(record("ns-a", "q1", 1)).is_some());
    }

    #[test]
    fn test_tombstone_keeps_only_identity_and_version() {
        let mut store = store(Scope::Cluster);
        let key = ObjectKey::new(Some("ns-a"), "q1");

        store.upsert(record("ns-a", "q1", 1));
        let deleted = store.delete(record("ns-a", "q1", 2)).unwrap();
        // Subscribers still see the final state of the object
        assert_eq!(deleted.record.payload["rv"], 2);

        let tombstone = store.records.get(&key).unwrap();
        assert!(tombstone.deleted);
        assert_eq!(tombstone.resource_version, 2);
        assert_eq!(tombstone.payload, Value::Null);
    }

    #[test]
    fn test_tombstones_stay_bounded() {
        let mut store = store(Scope::Cluster).with_tombstone_limit(16);
        let padding = "x".repeat(1024);

        for i in 0..10_000u64 {
            let name = format!("q{}", i);
            let mut created = record("ns-a", &name, 2 * i + 1);
            created.payload["padding"] = json!(padding);
            store.upsert(created);
            store.delete(record("ns-a", &name, 2 * i + 2));
        }

        assert!(store.is_empty());
        assert_eq!(store.tombstones.len(), 16);
        assert_eq!(store.records.len(), 16);
        assert!(store.records.values().all(|r| r.payload.is_null()));

        // The most recent deletions are the ones remembered
        let newest = ObjectKey::new(Some("ns-a"), "q9999");
        assert!(store.upsert(record("ns-a", "q9999", 3)).is_none());
        assert!(store.get(&newest).is_none());
    }

    #[test]
    fn test_readd_clears_tombstone() {
        let mut store = store(Scope::Cluster);

        store.upsert(record("ns-a", "q1", 1));
        store.delete(record("ns-a", "q1", 2));
        store.upsert(record("ns-a", "q1", 3));
        assert!(store.tombstones.is_empty());
        assert_eq!(store.len(), 1);

        store.resync(vec![record("ns-a", "q1", 3)]);
        assert!(store.tombstones.is_empty());
        assert_eq!(store.len(), 1);
    }
}
