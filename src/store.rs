use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::DurableSlot;
use crate::entities::{Coordinates, SavedLocation};

pub const DEFAULT_SLOT_KEY: &str = "savedLocations";

/// Whether a mutation reached durable storage or only lives in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    Persisted,
    MemoryOnly,
}

#[derive(Clone, Debug, Serialize)]
pub struct Saved {
    pub location: SavedLocation,
    pub durability: Durability,
}

/// Authoritative collection of saved locations for the running process.
///
/// Records are kept in insertion order and written wholesale to the durable
/// slot after every mutation. Slot failures are logged and reported through
/// [`Durability`], never returned as errors.
pub struct LocationStore {
    slot: Arc<dyn DurableSlot>,
    key: String,
    locations: Mutex<Vec<SavedLocation>>,
}

impl LocationStore {
    pub fn new(slot: Arc<dyn DurableSlot>, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
            locations: Mutex::new(Vec::new()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn add(&self, name: String, coordinates: Coordinates, address: Option<String>) -> Saved {
        let location = SavedLocation::new(name, coordinates, address.unwrap_or_default());

        let mut locations = self.locations.lock().await;
        locations.push(location.clone());
        let durability = self.persist(&locations).await;

        tracing::info!(id = %location.id, ?durability, "location saved");

        Saved {
            location,
            durability,
        }
    }

    /// Most recent first.
    pub async fn list(&self) -> Vec<SavedLocation> {
        self.locations.lock().await.iter().rev().cloned().collect()
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Option<Durability> {
        let mut locations = self.locations.lock().await;

        let index = locations.iter().position(|location| location.id == id)?;
        locations.remove(index);

        Some(self.persist(&locations).await)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<SavedLocation> {
        self.locations
            .lock()
            .await
            .iter()
            .find(|location| location.id == id)
            .cloned()
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> Durability {
        let mut locations = self.locations.lock().await;
        locations.clear();

        self.persist(&locations).await
    }

    /// Replaces the in-memory collection with whatever the slot holds. An
    /// absent, unreadable or non-list slot leaves an empty collection.
    /// Individual records that fail to decode are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn load_from_durable_storage(&self) {
        let mut locations = self.locations.lock().await;

        let entries = match self.slot.read(&self.key).await {
            Ok(Some(Value::Array(entries))) => entries,
            Ok(Some(_)) => {
                tracing::warn!("stored locations are not a list, starting empty");
                Vec::new()
            }
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(%err, "failed to read stored locations, starting empty");
                Vec::new()
            }
        };

        let loaded: Vec<SavedLocation> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(location) => Some(location),
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed stored location");
                    None
                }
            })
            .collect();

        tracing::info!(count = loaded.len(), "loaded saved locations");

        *locations = loaded;
    }

    async fn persist(&self, locations: &[SavedLocation]) -> Durability {
        let value = match serde_json::to_value(locations) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(%err, "failed to serialize saved locations");
                return Durability::MemoryOnly;
            }
        };

        match self.slot.write(&self.key, &value).await {
            Ok(()) => Durability::Persisted,
            Err(err) => {
                tracing::error!(%err, "failed to persist saved locations");
                Durability::MemoryOnly
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySlot;
    use crate::testing::FailingSlot;
    use serde_json::json;
    use tokio_test::block_on;

    fn coordinates(lng: f64, lat: f64) -> Coordinates {
        Coordinates::new(lng, lat).unwrap()
    }

    fn memory_store() -> (Arc<MemorySlot>, LocationStore) {
        let slot = Arc::new(MemorySlot::new());
        let store = LocationStore::new(slot.clone(), DEFAULT_SLOT_KEY);
        (slot, store)
    }

    #[test]
    fn add_then_find_returns_the_same_record() {
        let (_, store) = memory_store();

        let saved = block_on(store.add("Cafe".into(), coordinates(-73.99, 40.73), None));
        assert_eq!(saved.durability, Durability::Persisted);
        assert_eq!(saved.location.address, "");

        let found = block_on(store.find_by_id(saved.location.id));
        assert_eq!(found, Some(saved.location));
    }

    #[test]
    fn list_is_most_recent_first() {
        let (_, store) = memory_store();

        let a = block_on(store.add("A".into(), coordinates(1.0, 1.0), None)).location;
        let b = block_on(store.add("B".into(), coordinates(2.0, 2.0), None)).location;
        let c = block_on(store.add("C".into(), coordinates(3.0, 3.0), None)).location;

        assert_eq!(block_on(store.list()), vec![c, b, a]);
    }

    #[test]
    fn list_returns_a_snapshot() {
        let (_, store) = memory_store();
        block_on(store.add("A".into(), coordinates(1.0, 1.0), None));

        let mut snapshot = block_on(store.list());
        snapshot.clear();

        assert_eq!(block_on(store.list()).len(), 1);
    }

    #[test]
    fn remove_drops_exactly_one_record() {
        let (slot, store) = memory_store();

        let a = block_on(store.add("A".into(), coordinates(1.0, 1.0), None)).location;
        block_on(store.add("B".into(), coordinates(2.0, 2.0), None));

        assert_eq!(block_on(store.remove(a.id)), Some(Durability::Persisted));
        assert_eq!(block_on(store.list()).len(), 1);
        assert_eq!(block_on(store.find_by_id(a.id)), None);

        let stored = block_on(slot.read(DEFAULT_SLOT_KEY)).unwrap().unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 1);
    }

    #[test]
    fn remove_of_unknown_id_is_a_no_op() {
        let (_, store) = memory_store();
        block_on(store.add("A".into(), coordinates(1.0, 1.0), None));
        let before = block_on(store.list());

        assert_eq!(block_on(store.remove(Uuid::new_v4())), None);
        assert_eq!(block_on(store.list()), before);
    }

    #[test]
    fn reload_restores_previous_session() {
        let slot = Arc::new(MemorySlot::new());

        let first = LocationStore::new(slot.clone(), DEFAULT_SLOT_KEY);
        block_on(first.add(
            "Cafe".into(),
            coordinates(-73.99, 40.73),
            Some("Cafe, New York".into()),
        ));

        let second = LocationStore::new(slot, DEFAULT_SLOT_KEY);
        block_on(second.load_from_durable_storage());

        let loaded = block_on(second.list());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Cafe");
        assert_eq!(loaded[0].coordinates, coordinates(-73.99, 40.73));
    }

    #[test]
    fn reload_of_empty_store_is_empty() {
        let (slot, store) = memory_store();
        assert_eq!(block_on(store.clear()), Durability::Persisted);

        let reloaded = LocationStore::new(slot, DEFAULT_SLOT_KEY);
        block_on(reloaded.load_from_durable_storage());
        assert!(block_on(reloaded.list()).is_empty());
    }

    #[test]
    fn load_replaces_in_memory_state_wholesale() {
        let (_, store) = memory_store();
        block_on(store.add("A".into(), coordinates(1.0, 1.0), None));
        block_on(store.clear());
        block_on(store.add("B".into(), coordinates(2.0, 2.0), None));

        block_on(store.load_from_durable_storage());

        let names: Vec<_> = block_on(store.list()).into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["B".to_string()]);
    }

    #[test]
    fn malformed_or_absent_slot_loads_empty() {
        let (slot, store) = memory_store();
        block_on(store.load_from_durable_storage());
        assert!(block_on(store.list()).is_empty());

        block_on(slot.write(DEFAULT_SLOT_KEY, &json!({ "not": "a list" }))).unwrap();
        block_on(store.load_from_durable_storage());
        assert!(block_on(store.list()).is_empty());

        block_on(slot.write(
            DEFAULT_SLOT_KEY,
            &json!([{ "id": Uuid::new_v4(), "name": "Bad", "coordinates": [500.0, 0.0] }]),
        ))
        .unwrap();
        block_on(store.load_from_durable_storage());
        assert!(block_on(store.list()).is_empty());
    }

    #[test]
    fn malformed_record_does_not_discard_its_neighbours() {
        let (slot, store) = memory_store();
        let good = Uuid::new_v4();

        block_on(slot.write(
            DEFAULT_SLOT_KEY,
            &json!([
                { "id": good, "name": "Good", "coordinates": [-73.99, 40.73] },
                { "id": Uuid::new_v4(), "name": "Bad", "coordinates": [500.0, 0.0] },
            ]),
        ))
        .unwrap();

        block_on(store.load_from_durable_storage());
        let loaded = block_on(store.list());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, good);

        block_on(store.add("New".into(), coordinates(1.0, 1.0), None));

        let stored = block_on(slot.read(DEFAULT_SLOT_KEY)).unwrap().unwrap();
        let names: Vec<_> = stored
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Good".to_string(), "New".to_string()]);
    }

    /// Slot whose reads wait until the test lets them through.
    struct GatedSlot {
        inner: MemorySlot,
        reading: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl DurableSlot for GatedSlot {
        async fn read(&self, key: &str) -> Result<Option<Value>, crate::error::Error> {
            self.reading.notify_one();
            self.release.notified().await;
            self.inner.read(key).await
        }

        async fn write(&self, key: &str, value: &Value) -> Result<(), crate::error::Error> {
            self.inner.write(key, value).await
        }
    }

    #[tokio::test]
    async fn add_during_load_is_not_overwritten() {
        let slot = Arc::new(GatedSlot {
            inner: MemorySlot::new(),
            reading: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let store = Arc::new(LocationStore::new(slot.clone(), DEFAULT_SLOT_KEY));

        let loading = tokio::spawn({
            let store = store.clone();
            async move { store.load_from_durable_storage().await }
        });
        slot.reading.notified().await;

        let adding = tokio::spawn({
            let store = store.clone();
            async move { store.add("Cafe".into(), coordinates(-73.99, 40.73), None).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        slot.release.notify_one();
        loading.await.unwrap();
        let saved = adding.await.unwrap();

        assert_eq!(store.list().await, vec![saved.location]);
    }

    #[test]
    fn failed_persistence_keeps_record_in_memory() {
        let store = LocationStore::new(Arc::new(FailingSlot), DEFAULT_SLOT_KEY);

        let saved = block_on(store.add("Cafe".into(), coordinates(-73.99, 40.73), None));
        assert_eq!(saved.durability, Durability::MemoryOnly);
        assert_eq!(block_on(store.find_by_id(saved.location.id)), Some(saved.location.clone()));

        assert_eq!(block_on(store.remove(saved.location.id)), Some(Durability::MemoryOnly));
        assert!(block_on(store.list()).is_empty());

        block_on(store.load_from_durable_storage());
        assert!(block_on(store.list()).is_empty());
    }

    #[test]
    fn ids_stay_unique_under_rapid_saves() {
        let (_, store) = memory_store();

        for i in 0..200 {
            block_on(store.add(format!("P{}", i), coordinates(0.0, 0.0), None));
        }

        let mut ids: Vec<_> = block_on(store.list()).into_iter().map(|l| l.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 200);
    }
}
