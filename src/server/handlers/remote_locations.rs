use axum::extract::{Extension, Json, Path};
use serde::Serialize;

use crate::entities::RemoteLocation;
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize)]
pub struct DeleteResponse {
    deleted: bool,
}

pub async fn list(Extension(api): Extension<DynAPI>) -> Result<Json<Vec<RemoteLocation>>, Error> {
    let locations = api.list_remote_locations().await?;

    Ok(locations.into())
}

pub async fn delete(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, Error> {
    let deleted = api.delete_remote_location(id).await?;

    Ok(DeleteResponse { deleted }.into())
}
