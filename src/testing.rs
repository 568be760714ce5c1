//! In-process stand-ins for the durable slot, the remote collection and the
//! map provider.

use async_trait::async_trait;
use geo_types::LineString;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::DurableSlot;
use crate::entities::{Coordinates, Place, ProviderRoute, ProviderStep, TravelMode};
use crate::error::{io_error, upstream_error, Error};
use crate::external::firestore::{Fields, RemoteCollection, RemoteDocument, CREATED_AT};
use crate::external::mapbox::{MapProvider, UNKNOWN_LOCATION};

pub struct FailingSlot;

#[async_trait]
impl DurableSlot for FailingSlot {
    async fn read(&self, _key: &str) -> Result<Option<Value>, Error> {
        Err(io_error(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "slot unavailable",
        )))
    }

    async fn write(&self, _key: &str, _value: &Value) -> Result<(), Error> {
        Err(io_error(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "slot unavailable",
        )))
    }
}

#[derive(Default)]
pub struct MemoryCollection {
    documents: Mutex<HashMap<String, Vec<RemoteDocument>>>,
    next_id: Mutex<u64>,
}

impl MemoryCollection {
    pub fn documents(&self, collection: &str) -> Vec<RemoteDocument> {
        self.documents
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteCollection for MemoryCollection {
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, Error> {
        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            format!("doc-{}", next_id)
        };

        self.documents
            .lock()
            .unwrap()
            .entry(collection.into())
            .or_default()
            .push(RemoteDocument {
                id: id.clone(),
                fields,
            });

        Ok(id)
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<RemoteDocument>, Error> {
        let mut documents = self.documents(collection);
        documents.sort_by_key(|document| {
            std::cmp::Reverse(
                document
                    .fields
                    .get(CREATED_AT)
                    .and_then(|value| value.as_timestamp()),
            )
        });

        Ok(documents)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), Error> {
        if let Some(documents) = self.documents.lock().unwrap().get_mut(collection) {
            documents.retain(|document| document.id != id);
        }

        Ok(())
    }
}

pub struct FailingCollection;

#[async_trait]
impl RemoteCollection for FailingCollection {
    async fn create_document(&self, _collection: &str, _fields: Fields) -> Result<String, Error> {
        Err(upstream_error())
    }

    async fn list_documents(&self, _collection: &str) -> Result<Vec<RemoteDocument>, Error> {
        Err(upstream_error())
    }

    async fn delete_document(&self, _collection: &str, _id: &str) -> Result<(), Error> {
        Err(upstream_error())
    }
}

/// Answers geocoding from a fixed table and routes every request with a
/// straight two-point line.
#[derive(Default)]
pub struct FakeMapProvider {
    pub places: HashMap<String, Place>,
    pub nearby: Vec<Place>,
    pub reverse: Option<String>,
    pub no_route: bool,
    pub failing: bool,
}

impl FakeMapProvider {
    pub fn with_place(mut self, query: &str, name: &str, lng: f64, lat: f64) -> Self {
        self.places.insert(
            query.into(),
            Place {
                name: name.into(),
                address: format!("{}, New York", name),
                coordinates: Coordinates::new(lng, lat).unwrap(),
            },
        );
        self
    }
}

#[async_trait]
impl MapProvider for FakeMapProvider {
    async fn geocode(&self, query: &str) -> Result<Option<Place>, Error> {
        if self.failing {
            return Err(upstream_error());
        }

        Ok(self.places.get(query).cloned())
    }

    async fn reverse_geocode(&self, _coordinates: Coordinates) -> String {
        self.reverse
            .clone()
            .unwrap_or_else(|| UNKNOWN_LOCATION.into())
    }

    async fn search_nearby(
        &self,
        _category: &str,
        _proximity: Coordinates,
    ) -> Result<Vec<Place>, Error> {
        if self.failing {
            return Err(upstream_error());
        }

        Ok(self.nearby.clone())
    }

    async fn directions(
        &self,
        _mode: TravelMode,
        start: Coordinates,
        end: Coordinates,
    ) -> Result<Option<ProviderRoute>, Error> {
        if self.failing {
            return Err(upstream_error());
        }

        if self.no_route {
            return Ok(None);
        }

        Ok(Some(ProviderRoute {
            distance: 1609.34,
            duration: 300.0,
            geometry: LineString::from(vec![
                (start.longitude(), start.latitude()),
                (end.longitude(), end.latitude()),
            ]),
            steps: vec![ProviderStep {
                instruction: "Drive <b>straight</b>".into(),
                distance: 1609.34,
            }],
        }))
    }
}
