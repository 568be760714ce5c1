use async_channel::{Receiver, Sender};
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::entities::{RemoteLocation, RouteQuery, SavedLocation};
use crate::external::firestore::{FieldValue, Fields, RemoteCollection, RemoteDocument, CREATED_AT};

pub const SAVED_LOCATIONS: &str = "saved_locations";
pub const ROUTE_HISTORY: &str = "route_history";
/// Route history entries carry their request time under this field.
pub const ROUTE_TIMESTAMP: &str = "timestamp";

/// Best-effort copy of saved locations (and route history) in a remote
/// collection. Every failure is logged and turned into a failure value.
#[derive(Clone)]
pub struct RemoteMirror {
    collection: Arc<dyn RemoteCollection>,
}

impl RemoteMirror {
    pub fn new(collection: Arc<dyn RemoteCollection>) -> Self {
        Self { collection }
    }

    /// Returns the remote id, `None` when the write failed.
    #[tracing::instrument(skip(self, location), fields(id = %location.id))]
    pub async fn mirror_add(&self, location: &SavedLocation) -> Option<String> {
        let fields = location_fields(location);

        match self.collection.create_document(SAVED_LOCATIONS, fields).await {
            Ok(remote_id) => {
                tracing::info!(%remote_id, "location mirrored");
                Some(remote_id)
            }
            Err(err) => {
                tracing::error!(%err, "failed to mirror location");
                None
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn mirror_delete(&self, remote_id: &str) -> bool {
        match self
            .collection
            .delete_document(SAVED_LOCATIONS, remote_id)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(%err, "failed to delete mirrored location");
                false
            }
        }
    }

    /// Newest first; empty when the remote listing fails.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_all(&self) -> Vec<RemoteLocation> {
        match self.collection.list_documents(SAVED_LOCATIONS).await {
            Ok(documents) => documents
                .into_iter()
                .filter_map(|document| {
                    let id = document.id.clone();
                    let location = remote_location(document);
                    if location.is_none() {
                        tracing::warn!(%id, "skipping undecodable remote location");
                    }
                    location
                })
                .collect(),
            Err(err) => {
                tracing::error!(%err, "failed to load mirrored locations");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(skip(self, route))]
    pub async fn mirror_route(&self, route: &RouteQuery) -> Option<String> {
        let fields = route_fields(route);

        match self.collection.create_document(ROUTE_HISTORY, fields).await {
            Ok(remote_id) => Some(remote_id),
            Err(err) => {
                tracing::error!(%err, "failed to record route history");
                None
            }
        }
    }
}

fn location_fields(location: &SavedLocation) -> Fields {
    Fields::from([
        ("name".into(), FieldValue::StringValue(location.name.clone())),
        (
            "longitude".into(),
            FieldValue::DoubleValue(location.coordinates.longitude()),
        ),
        (
            "latitude".into(),
            FieldValue::DoubleValue(location.coordinates.latitude()),
        ),
        (
            "description".into(),
            FieldValue::StringValue(location.address.clone()),
        ),
        (CREATED_AT.into(), FieldValue::TimestampValue(Utc::now())),
    ])
}

fn route_fields(route: &RouteQuery) -> Fields {
    Fields::from([
        (
            "startLocation".into(),
            FieldValue::StringValue(route.start.label.clone()),
        ),
        (
            "endLocation".into(),
            FieldValue::StringValue(route.end.label.clone()),
        ),
        ("distance".into(), FieldValue::DoubleValue(route.distance)),
        ("duration".into(), FieldValue::DoubleValue(route.duration)),
        ("mode".into(), FieldValue::StringValue(route.mode.name().into())),
        (
            ROUTE_TIMESTAMP.into(),
            FieldValue::TimestampValue(route.requested_at),
        ),
    ])
}

fn remote_location(document: RemoteDocument) -> Option<RemoteLocation> {
    let fields = &document.fields;

    Some(RemoteLocation {
        name: fields.get("name")?.as_str()?.to_string(),
        longitude: fields.get("longitude")?.as_f64()?,
        latitude: fields.get("latitude")?.as_f64()?,
        description: fields
            .get("description")
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_string(),
        created_at: fields.get(CREATED_AT).and_then(FieldValue::as_timestamp),
        id: document.id,
    })
}

#[derive(Clone, Debug)]
pub enum MirrorTask {
    Add(SavedLocation),
    Route(RouteQuery),
}

/// Fire-and-forget front of a [`RemoteMirror`]: tasks are queued without
/// waiting and applied one at a time, in push order, by a single worker.
pub struct MirrorQueue {
    sender: Sender<MirrorTask>,
}

impl MirrorQueue {
    pub fn start(mirror: RemoteMirror) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = async_channel::unbounded();
        let worker = tokio::spawn(run_worker(mirror, receiver));

        (Self { sender }, worker)
    }

    pub fn push(&self, task: MirrorTask) {
        if let Err(err) = self.sender.try_send(task) {
            tracing::warn!(task = ?err.into_inner(), "mirror queue closed, dropping task");
        }
    }

    /// Stops accepting tasks; the worker finishes what is queued and exits.
    pub fn close(&self) {
        self.sender.close();
    }
}

async fn run_worker(mirror: RemoteMirror, receiver: Receiver<MirrorTask>) {
    while let Ok(task) = receiver.recv().await {
        match task {
            MirrorTask::Add(location) => {
                mirror.mirror_add(&location).await;
            }
            MirrorTask::Route(route) => {
                mirror.mirror_route(&route).await;
            }
        }
    }

    tracing::debug!("mirror worker stopped");
}
