use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{
    Coordinates, NearbyPlaces, Place, RemoteLocation, RouteQuery, SavedLocation, TravelMode,
};
use crate::error::Error;
use crate::store::{Durability, Saved};

#[async_trait]
pub trait LocationAPI {
    async fn save_location(
        &self,
        name: Option<String>,
        coordinates: Coordinates,
        address: Option<String>,
    ) -> Result<Saved, Error>;
    async fn list_locations(&self) -> Result<Vec<SavedLocation>, Error>;
    async fn find_location(&self, id: Uuid) -> Result<SavedLocation, Error>;
    async fn delete_location(&self, id: Uuid) -> Result<Option<Durability>, Error>;
    async fn clear_locations(&self) -> Result<Durability, Error>;
}

#[async_trait]
pub trait PlacesAPI {
    async fn search_place(&self, query: String) -> Result<Place, Error>;
    async fn find_nearby(&self, category: String, center: Coordinates)
        -> Result<NearbyPlaces, Error>;
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, Error>;
}

#[async_trait]
pub trait DirectionsAPI {
    async fn get_directions(
        &self,
        start: String,
        end: String,
        mode: TravelMode,
    ) -> Result<RouteQuery, Error>;
    async fn directions_to_saved_location(
        &self,
        id: Uuid,
        origin: Option<String>,
        user_position: Option<Coordinates>,
        mode: TravelMode,
    ) -> Result<RouteQuery, Error>;
}

#[async_trait]
pub trait RemoteLocationAPI {
    async fn list_remote_locations(&self) -> Result<Vec<RemoteLocation>, Error>;
    async fn delete_remote_location(&self, remote_id: String) -> Result<bool, Error>;
}

pub trait API: LocationAPI + PlacesAPI + DirectionsAPI + RemoteLocationAPI {}
