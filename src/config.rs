use std::env::{self, VarError};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{config_error, Error};
use crate::store::DEFAULT_SLOT_KEY;

const DEFAULT_MAPBOX_API_BASE: &str = "api.mapbox.com";
const DEFAULT_FIRESTORE_API_BASE: &str = "firestore.googleapis.com";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct Config {
    pub mapbox: MapboxConfig,
    pub firestore: Option<FirestoreConfig>,
    pub storage: StorageConfig,
    pub slot_key: String,
    pub listen_addr: SocketAddr,
}

#[derive(Clone)]
pub struct MapboxConfig {
    pub api_base: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct FirestoreConfig {
    pub api_base: String,
    pub project_id: String,
    pub api_key: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StorageConfig {
    Postgres { url: String, max_connections: u32 },
    File { dir: PathBuf },
    Memory,
}

// Hand-written so access tokens never end up in logs.
impl std::fmt::Debug for MapboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapboxConfig")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("api_base", &self.api_base)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key))
    }

    /// Builds the configuration from any variable source, `env::var` in
    /// production.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let optional = |key: &str| -> Result<Option<String>, Error> {
            match lookup(key) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(VarError::NotPresent) => Ok(None),
                Err(err) => Err(err.into()),
            }
        };

        let access_token = optional("MAPBOX_ACCESS_TOKEN")?
            .ok_or_else(|| config_error("MAPBOX_ACCESS_TOKEN is required"))?;

        let mapbox = MapboxConfig {
            api_base: optional("MAPBOX_API_BASE")?.unwrap_or_else(|| DEFAULT_MAPBOX_API_BASE.into()),
            access_token,
        };

        let firestore = match (optional("FIRESTORE_PROJECT_ID")?, optional("FIRESTORE_API_KEY")?) {
            (Some(project_id), Some(api_key)) => Some(FirestoreConfig {
                api_base: optional("FIRESTORE_API_BASE")?
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_API_BASE.into()),
                project_id,
                api_key,
            }),
            (None, None) => None,
            _ => {
                return Err(config_error(
                    "FIRESTORE_PROJECT_ID and FIRESTORE_API_KEY must be set together",
                ))
            }
        };

        let storage = if let Some(url) = optional("DATABASE_URL")? {
            let max_connections = match optional("DATABASE_MAX_CONNECTIONS")? {
                Some(value) => value
                    .parse()
                    .map_err(|_| config_error("DATABASE_MAX_CONNECTIONS must be a number"))?,
                None => 5,
            };
            StorageConfig::Postgres {
                url,
                max_connections,
            }
        } else if let Some(dir) = optional("WAYFARER_DATA_DIR")? {
            StorageConfig::File { dir: dir.into() }
        } else {
            StorageConfig::Memory
        };

        let listen_addr = optional("WAYFARER_LISTEN_ADDR")?
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into())
            .parse()
            .map_err(|_| config_error("WAYFARER_LISTEN_ADDR must be host:port"))?;

        Ok(Self {
            mapbox,
            firestore,
            storage,
            slot_key: optional("WAYFARER_SLOT_KEY")?.unwrap_or_else(|| DEFAULT_SLOT_KEY.into()),
            listen_addr,
        })
    }
}

#[cfg(test)]
fn lookup_from(
    vars: &'static [(&'static str, &'static str)],
) -> impl Fn(&str) -> Result<String, VarError> {
    move |key| {
        vars.iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn defaults_apply_when_only_token_is_set() {
    let config = Config::from_lookup(lookup_from(&[("MAPBOX_ACCESS_TOKEN", "pk.test")])).unwrap();

    assert_eq!(config.mapbox.api_base, DEFAULT_MAPBOX_API_BASE);
    assert!(config.firestore.is_none());
    assert_eq!(config.storage, StorageConfig::Memory);
    assert_eq!(config.slot_key, DEFAULT_SLOT_KEY);
    assert_eq!(config.listen_addr.port(), 3000);
}

#[test]
fn database_url_takes_precedence_over_data_dir() {
    let config = Config::from_lookup(lookup_from(&[
        ("MAPBOX_ACCESS_TOKEN", "pk.test"),
        ("DATABASE_URL", "postgresql://localhost/wayfarer"),
        ("WAYFARER_DATA_DIR", "/tmp/wayfarer"),
    ]))
    .unwrap();

    assert_eq!(
        config.storage,
        StorageConfig::Postgres {
            url: "postgresql://localhost/wayfarer".into(),
            max_connections: 5,
        }
    );
}

#[test]
fn missing_token_or_half_firestore_config_is_rejected() {
    assert!(Config::from_lookup(lookup_from(&[])).is_err());

    assert!(Config::from_lookup(lookup_from(&[
        ("MAPBOX_ACCESS_TOKEN", "pk.test"),
        ("FIRESTORE_PROJECT_ID", "wayfarer"),
    ]))
    .is_err());
}

#[test]
fn debug_output_hides_secrets() {
    let config = Config::from_lookup(lookup_from(&[
        ("MAPBOX_ACCESS_TOKEN", "pk.secret"),
        ("FIRESTORE_PROJECT_ID", "wayfarer"),
        ("FIRESTORE_API_KEY", "AIza-secret"),
    ]))
    .unwrap();

    let debug = format!("{:?}", config);
    assert!(debug.contains("wayfarer"));
    assert!(!debug.contains("secret"));
}
