mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{delete, get, post},
    Router,
};

use crate::api::API;
use crate::error::{server_error, Error};
use crate::server::handlers::{directions, locations, places, remote_locations};

pub type DynAPI = Arc<dyn API + Send + Sync>;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route(
            "/locations",
            get(locations::list)
                .post(locations::create)
                .delete(locations::clear),
        )
        .route(
            "/locations/:id",
            get(locations::find).delete(locations::delete),
        )
        .route("/locations/:id/directions", post(directions::to_saved_location))
        .route("/places/search", get(places::search))
        .route("/places/nearby", get(places::nearby))
        .route("/places/reverse", get(places::reverse))
        .route("/directions", post(directions::create))
        .route("/remote_locations", get(remote_locations::list))
        .route("/remote_locations/:id", delete(remote_locations::delete))
        .layer(Extension(api))
}

/// Serves until Ctrl-C, then returns so the caller can tear down.
pub async fn serve(api: DynAPI, addr: SocketAddr) -> Result<(), Error> {
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await
        .map_err(server_error)
}
