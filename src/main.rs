use std::sync::Arc;

use wayfarer::config::Config;
use wayfarer::engine::Engine;
use wayfarer::error::Error;
use wayfarer::server::{serve, DynAPI};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");

    let engine = Arc::new(Engine::from_config(&config).await?);

    serve(engine.clone() as DynAPI, config.listen_addr).await?;

    match Arc::try_unwrap(engine) {
        Ok(mut engine) => engine.shutdown().await,
        Err(_) => tracing::warn!("engine still in use, pending remote writes may be lost"),
    }

    Ok(())
}
