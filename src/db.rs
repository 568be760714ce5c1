use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::error::{invalid_input_message, Error};

/// A durable named slot holding one JSON value per key. Every write replaces
/// the whole value.
#[async_trait]
pub trait DurableSlot: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Value>, Error>;
    async fn write(&self, key: &str, value: &Value) -> Result<(), Error>;
}

pub struct PgSlot {
    pool: Pool<Postgres>,
}

impl PgSlot {
    #[tracing::instrument(name = "PgSlot::new", skip(db_uri))]
    pub async fn new(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        pool.execute("CREATE TABLE IF NOT EXISTS slots (key VARCHAR PRIMARY KEY, data JSONB NOT NULL)")
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DurableSlot for PgSlot {
    #[tracing::instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        let mut conn = self.pool.acquire().await?;

        let maybe_result = conn
            .fetch_optional(sqlx::query("SELECT data FROM slots WHERE key = $1").bind(key))
            .await?;

        match maybe_result {
            Some(row) => {
                let Json(value): Json<Value> = row.try_get("data")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, value))]
    async fn write(&self, key: &str, value: &Value) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query(
                "INSERT INTO slots (key, data) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data",
            )
            .bind(key)
            .bind(Json(value)),
        )
        .await?;

        Ok(())
    }
}

/// One `<key>.json` file per slot inside a data directory.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> Result<PathBuf, Error> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(invalid_input_message(format!("invalid slot key {:?}", key)));
        }

        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl DurableSlot for FileSlot {
    #[tracing::instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        let path = self.path(key)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    #[tracing::instrument(skip(self, value))]
    async fn write(&self, key: &str, value: &Value) -> Result<(), Error> {
        let path = self.path(key)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, serde_json::to_vec(value)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(())
    }
}

/// Process-lifetime slot, used when no durable backend is configured.
#[derive(Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableSlot for MemorySlot {
    async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &Value) -> Result<(), Error> {
        self.values.lock().await.insert(key.into(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("wayfarer-{}-{}", name, uuid::Uuid::new_v4()))
}

#[test]
fn file_slot_round_trips_and_reports_absent_keys() {
    use serde_json::json;
    use tokio_test::block_on;

    let dir = scratch_dir("slot");
    let slot = FileSlot::new(&dir);

    assert_eq!(block_on(slot.read("savedLocations")).unwrap(), None);

    let value = json!([{ "name": "Cafe" }]);
    block_on(slot.write("savedLocations", &value)).unwrap();
    assert_eq!(block_on(slot.read("savedLocations")).unwrap(), Some(value));

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn file_slot_surfaces_malformed_content_as_error() {
    use tokio_test::block_on;

    let dir = scratch_dir("corrupt");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("savedLocations.json"), "{not json").unwrap();

    let slot = FileSlot::new(&dir);
    assert!(block_on(slot.read("savedLocations")).is_err());

    std::fs::write(dir.join("savedLocations.json"), "  \n").unwrap();
    assert_eq!(block_on(slot.read("savedLocations")).unwrap(), None);

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn file_slot_rejects_path_like_keys() {
    use tokio_test::block_on;

    let slot = FileSlot::new(scratch_dir("keys"));
    assert!(block_on(slot.read("../etc/passwd")).is_err());
    assert!(block_on(slot.write("", &serde_json::json!([]))).is_err());
}
