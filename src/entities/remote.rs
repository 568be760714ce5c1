use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved location as it exists in the remote collection. Its `id` is
/// assigned by the remote service and unrelated to local ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteLocation {
    pub id: String,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}
