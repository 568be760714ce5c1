use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Coordinates, SavedLocation};
use crate::error::Error;
use crate::server::DynAPI;
use crate::store::{Durability, Saved};

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    name: Option<String>,
    coordinates: Coordinates,
    address: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    deleted: bool,
    durability: Option<Durability>,
}

#[derive(Serialize)]
pub struct ClearResponse {
    durability: Durability,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Saved>, Error> {
    let saved = api
        .save_location(params.name, params.coordinates, params.address)
        .await?;

    Ok(saved.into())
}

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<Vec<SavedLocation>>, Error> {
    let locations = api.list_locations().await?;

    Ok(locations.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<SavedLocation>, Error> {
    let location = api.find_location(id).await?;

    Ok(location.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, Error> {
    let durability = api.delete_location(id).await?;

    Ok(DeleteResponse {
        deleted: durability.is_some(),
        durability,
    }
    .into())
}

pub async fn clear(Extension(api): Extension<DynAPI>) -> Result<Json<ClearResponse>, Error> {
    let durability = api.clear_locations().await?;

    Ok(ClearResponse { durability }.into())
}
