use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::LocationAPI,
    entities::{location_name, Coordinates, SavedLocation},
    error::{not_found_error, Error},
    mirror::MirrorTask,
    store::{Durability, Saved},
};

#[async_trait]
impl LocationAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn save_location(
        &self,
        name: Option<String>,
        coordinates: Coordinates,
        address: Option<String>,
    ) -> Result<Saved, Error> {
        let name = location_name(name);

        let address = match address {
            Some(address) if !address.trim().is_empty() => address,
            _ => self.maps.reverse_geocode(coordinates).await,
        };

        let saved = self.store.add(name, coordinates, Some(address)).await;

        self.mirror_later(MirrorTask::Add(saved.location.clone()));

        Ok(saved)
    }

    #[tracing::instrument(skip(self))]
    async fn list_locations(&self) -> Result<Vec<SavedLocation>, Error> {
        Ok(self.store.list().await)
    }

    #[tracing::instrument(skip(self))]
    async fn find_location(&self, id: Uuid) -> Result<SavedLocation, Error> {
        self.store
            .find_by_id(id)
            .await
            .ok_or_else(not_found_error)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_location(&self, id: Uuid) -> Result<Option<Durability>, Error> {
        Ok(self.store.remove(id).await)
    }

    #[tracing::instrument(skip(self))]
    async fn clear_locations(&self) -> Result<Durability, Error> {
        Ok(self.store.clear().await)
    }
}
