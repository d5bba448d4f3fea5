// ── Tracked device cache ──
//
// Last-known capability values per registered device, one concurrent map
// per device kind. Entries are created by the host's registration hook
// and updated by the reconciler; the engine itself never deletes them.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::{DeviceKind, TrackedDevice};

pub struct DeviceStore {
    tags: DashMap<String, TrackedDevice>,
    phones: DashMap<String, TrackedDevice>,
    /// Bumped on every mutation so observers can re-render.
    version: watch::Sender<u64>,
}

impl DeviceStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            tags: DashMap::new(),
            phones: DashMap::new(),
            version,
        }
    }

    fn map(&self, kind: DeviceKind) -> &DashMap<String, TrackedDevice> {
        match kind {
            DeviceKind::Tag => &self.tags,
            DeviceKind::Phone => &self.phones,
        }
    }

    /// Register a device. Returns `false` (and keeps the cached state) if
    /// the device was already known.
    pub fn register(&self, kind: DeviceKind, external_id: &str) -> bool {
        let inserted = match self.map(kind).entry(external_id.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(TrackedDevice::new(kind, external_id));
                true
            }
        };
        if inserted {
            self.bump_version();
        }
        inserted
    }

    /// Drop a device the host deleted.
    pub fn forget(&self, kind: DeviceKind, external_id: &str) -> Option<TrackedDevice> {
        let removed = self.map(kind).remove(external_id).map(|(_, d)| d);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Owned copy of a device's cached state.
    pub fn get(&self, kind: DeviceKind, external_id: &str) -> Option<TrackedDevice> {
        self.map(kind).get(external_id).map(|d| d.value().clone())
    }

    pub fn contains(&self, kind: DeviceKind, external_id: &str) -> bool {
        self.map(kind).contains_key(external_id)
    }

    /// Apply `f` to a cached device. Returns `false` if it is not registered.
    ///
    /// The map shard stays locked only for the duration of `f`, which must
    /// not await.
    pub fn update(
        &self,
        kind: DeviceKind,
        external_id: &str,
        f: impl FnOnce(&mut TrackedDevice),
    ) -> bool {
        let updated = match self.map(kind).get_mut(external_id) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        };
        if updated {
            self.bump_version();
        }
        updated
    }

    /// External ids of every registered device of one kind, sorted.
    pub fn ids(&self, kind: DeviceKind) -> Vec<String> {
        let mut ids: Vec<String> = self.map(kind).iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Owned copies of every registered device, tags first.
    pub fn all(&self) -> Vec<TrackedDevice> {
        DeviceKind::ALL
            .iter()
            .flat_map(|kind| {
                let mut devices: Vec<TrackedDevice> =
                    self.map(*kind).iter().map(|r| r.value().clone()).collect();
                devices.sort_by(|a, b| a.external_id.cmp(&b.external_id));
                devices
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len() + self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_and_keeps_state() {
        let store = DeviceStore::new();
        assert!(store.register(DeviceKind::Tag, "AA"));
        store.update(DeviceKind::Tag, "AA", |d| d.last_connected = Some(true));

        assert!(!store.register(DeviceKind::Tag, "AA"));
        assert_eq!(
            store.get(DeviceKind::Tag, "AA").and_then(|d| d.last_connected),
            Some(true)
        );
    }

    #[test]
    fn kinds_are_separate_namespaces() {
        let store = DeviceStore::new();
        store.register(DeviceKind::Tag, "1");
        assert!(store.contains(DeviceKind::Tag, "1"));
        assert!(!store.contains(DeviceKind::Phone, "1"));
        assert!(!store.update(DeviceKind::Phone, "1", |_| {}));
    }

    #[test]
    fn forget_removes_and_bumps_version() {
        let store = DeviceStore::new();
        let rx = store.subscribe();
        store.register(DeviceKind::Phone, "p1");
        let before = *rx.borrow();

        assert!(store.forget(DeviceKind::Phone, "p1").is_some());
        assert!(store.forget(DeviceKind::Phone, "p1").is_none());
        assert_eq!(*rx.borrow(), before + 1);
        assert!(store.is_empty());
    }

    #[test]
    fn all_lists_tags_before_phones_sorted() {
        let store = DeviceStore::new();
        store.register(DeviceKind::Phone, "p1");
        store.register(DeviceKind::Tag, "BB");
        store.register(DeviceKind::Tag, "AA");

        let ids: Vec<_> = store.all().into_iter().map(|d| d.external_id).collect();
        assert_eq!(ids, vec!["AA", "BB", "p1"]);
        assert_eq!(store.ids(DeviceKind::Tag), vec!["AA", "BB"]);
    }
}
