use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};

use crate::entities::{CoordinateParams, Coordinates, NearbyPlaces, Place};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct SearchParams {
    query: String,
}

#[derive(Serialize, Deserialize)]
pub struct NearbyParams {
    category: String,
    longitude: f64,
    latitude: f64,
}

#[derive(Serialize, Deserialize)]
pub struct ReverseResponse {
    place_name: String,
}

pub async fn search(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Place>, Error> {
    let place = api.search_place(params.query).await?;

    Ok(place.into())
}

pub async fn nearby(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<NearbyPlaces>, Error> {
    let center = Coordinates::new(params.longitude, params.latitude)?;
    let nearby = api.find_nearby(params.category, center).await?;

    Ok(nearby.into())
}

pub async fn reverse(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<CoordinateParams>,
) -> Result<Json<ReverseResponse>, Error> {
    let place_name = api.reverse_geocode(Coordinates::try_from(params)?).await?;

    Ok(ReverseResponse { place_name }.into())
}
