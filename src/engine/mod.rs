mod directions_api;
mod location_api;
mod places_api;
mod remote_location_api;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::{
    api::API,
    config::{Config, StorageConfig},
    db::{DurableSlot, FileSlot, MemorySlot, PgSlot},
    error::Error,
    external::{
        firestore::FirestoreCollection,
        mapbox::{MapProvider, MapboxClient},
    },
    mirror::{MirrorQueue, MirrorTask, RemoteMirror},
    store::LocationStore,
};

/// Application state: the saved-location store, the optional remote mirror
/// and the map provider, owned explicitly instead of living in globals.
pub struct Engine {
    store: LocationStore,
    maps: Arc<dyn MapProvider>,
    remote: Option<RemoteMirror>,
    queue: Option<MirrorQueue>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// Loads the store from its durable slot and, when a mirror is given,
    /// starts its background worker. Must run inside a Tokio runtime.
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(
        store: LocationStore,
        maps: Arc<dyn MapProvider>,
        remote: Option<RemoteMirror>,
    ) -> Self {
        store.load_from_durable_storage().await;

        let (queue, worker) = match &remote {
            Some(remote) => {
                let (queue, worker) = MirrorQueue::start(remote.clone());
                (Some(queue), Some(worker))
            }
            None => {
                tracing::info!("remote mirror disabled");
                (None, None)
            }
        };

        Self {
            store,
            maps,
            remote,
            queue,
            worker,
        }
    }

    #[tracing::instrument(name = "Engine::from_config", skip_all)]
    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let slot: Arc<dyn DurableSlot> = match &config.storage {
            StorageConfig::Postgres {
                url,
                max_connections,
            } => Arc::new(PgSlot::new(url, *max_connections).await?),
            StorageConfig::File { dir } => Arc::new(FileSlot::new(dir.clone())),
            StorageConfig::Memory => {
                tracing::warn!("no durable storage configured, saved locations last for this process only");
                Arc::new(MemorySlot::new())
            }
        };

        let store = LocationStore::new(slot, config.slot_key.clone());

        let maps = Arc::new(MapboxClient::new(
            config.mapbox.api_base.clone(),
            config.mapbox.access_token.clone(),
        ));

        let remote = config.firestore.as_ref().map(|firestore| {
            RemoteMirror::new(Arc::new(FirestoreCollection::new(
                firestore.api_base.clone(),
                firestore.project_id.clone(),
                firestore.api_key.clone(),
            )))
        });

        Ok(Self::new(store, maps, remote).await)
    }

    /// Queues a remote write without waiting for it.
    fn mirror_later(&self, task: MirrorTask) {
        if let Some(queue) = &self.queue {
            queue.push(task);
        }
    }

    /// Lets queued remote writes finish, then stops the mirror worker. Later
    /// saves stay local only.
    #[tracing::instrument(name = "Engine::shutdown", skip_all)]
    pub async fn shutdown(&mut self) {
        if let Some(queue) = self.queue.take() {
            queue.close();
        }

        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                tracing::error!(%err, "mirror worker failed");
            }
        }
    }
}

impl API for Engine {}
