use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Coordinates, RouteQuery, TravelMode};
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    start: String,
    end: String,
    #[serde(default)]
    mode: TravelMode,
}

#[derive(Serialize, Deserialize)]
pub struct ToSavedLocationParams {
    origin: Option<String>,
    user_position: Option<Coordinates>,
    #[serde(default)]
    mode: TravelMode,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateParams>,
) -> Result<Json<RouteQuery>, Error> {
    let route = api
        .get_directions(params.start, params.end, params.mode)
        .await?;

    Ok(route.into())
}

pub async fn to_saved_location(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<ToSavedLocationParams>,
) -> Result<Json<RouteQuery>, Error> {
    let route = api
        .directions_to_saved_location(id, params.origin, params.user_position, params.mode)
        .await?;

    Ok(route.into())
}

#[test]
fn mode_defaults_to_driving() {
    let params: CreateParams =
        serde_json::from_value(serde_json::json!({ "start": "home", "end": "work" })).unwrap();
    assert_eq!(params.mode, TravelMode::Driving);

    let params: ToSavedLocationParams = serde_json::from_value(serde_json::json!({
        "user_position": [-73.98, 40.75],
        "mode": "transit",
    }))
    .unwrap();
    assert_eq!(params.mode, TravelMode::Transit);
    assert!(params.origin.is_none());
}
