use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::error::{invalid_input_error, not_found_error, upstream_error, Error};

/// The field every document carries and listings are ordered by.
pub const CREATED_AT: &str = "createdAt";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldValue {
    NullValue(()),
    BooleanValue(bool),
    StringValue(String),
    DoubleValue(f64),
    // Firestore encodes 64-bit integers as strings.
    IntegerValue(String),
    TimestampValue(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::StringValue(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::DoubleValue(value) => Some(*value),
            Self::IntegerValue(value) => value.parse::<i64>().ok().map(|v| v as f64),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::TimestampValue(value) => Some(*value),
            _ => None,
        }
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Clone, Debug, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub fields: Fields,
}

/// A remote document collection. Ids are assigned by the remote side and
/// listings come back newest `createdAt` first.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, Error>;
    async fn list_documents(&self, collection: &str) -> Result<Vec<RemoteDocument>, Error>;
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), Error>;
}

// Fields stay raw until a document is picked apart, so value types we do
// not model only cost their own field.
#[derive(Debug, Deserialize)]
struct Document {
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
}

impl Document {
    fn into_remote(self) -> Result<RemoteDocument, Error> {
        let id = document_id(&self.name)?;

        let fields = self
            .fields
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(value) => Some((key, value)),
                Err(err) => {
                    tracing::debug!(%key, %err, "ignoring unsupported field value");
                    None
                }
            })
            .collect();

        Ok(RemoteDocument { id, fields })
    }
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    document: Option<Document>,
}

/// Last path segment of a full document name,
/// `projects/p/databases/(default)/documents/<collection>/<id>`.
fn document_id(name: &str) -> Result<String, Error> {
    match name.rsplit('/').next() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(upstream_error()),
    }
}

fn parse_query_results(results: Vec<QueryResult>) -> Vec<RemoteDocument> {
    results
        .into_iter()
        .filter_map(|result| result.document)
        .filter_map(|document| match document.into_remote() {
            Ok(document) => Some(document),
            Err(_) => {
                tracing::warn!("skipping remote document without a usable name");
                None
            }
        })
        .collect()
}

/// Firestore over its REST API, authenticated with a web API key.
pub struct FirestoreCollection {
    client: Client,
    api_base: String,
    project_id: String,
    api_key: String,
}

impl FirestoreCollection {
    pub fn new(api_base: String, project_id: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_base,
            project_id,
            api_key,
        }
    }

    fn documents_url(&self) -> String {
        format!(
            "https://{}/v1/projects/{}/databases/(default)/documents",
            self.api_base, self.project_id
        )
    }

    fn check_status(res: &Response) -> Result<(), Error> {
        let status = res.status();

        if status == StatusCode::NOT_FOUND {
            return Err(not_found_error());
        } else if status.is_client_error() {
            return Err(invalid_input_error());
        } else if status != StatusCode::OK {
            return Err(upstream_error());
        }

        Ok(())
    }
}

#[async_trait]
impl RemoteCollection for FirestoreCollection {
    #[tracing::instrument(skip(self, fields))]
    async fn create_document(&self, collection: &str, fields: Fields) -> Result<String, Error> {
        let url = format!("{}/{}", self.documents_url(), collection);

        let res = self
            .client
            .post(url)
            .query(&[("key", &self.api_key)])
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        Self::check_status(&res)?;

        let document: Document = res.json().await?;
        let id = document_id(&document.name)?;

        Ok(id)
    }

    #[tracing::instrument(skip(self))]
    async fn list_documents(&self, collection: &str) -> Result<Vec<RemoteDocument>, Error> {
        let url = format!("{}:runQuery", self.documents_url());

        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "orderBy": [{
                    "field": { "fieldPath": CREATED_AT },
                    "direction": "DESCENDING",
                }],
            }
        });

        let res = self
            .client
            .post(url)
            .query(&[("key", &self.api_key)])
            .json(&query)
            .send()
            .await?;

        Self::check_status(&res)?;

        let results: Vec<QueryResult> = res.json().await?;

        Ok(parse_query_results(results))
    }

    #[tracing::instrument(skip(self))]
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), Error> {
        let url = format!("{}/{}/{}", self.documents_url(), collection, id);

        let res = self
            .client
            .delete(url)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;

        Self::check_status(&res)
    }
}

#[test]
fn field_values_use_firestore_encoding() {
    let mut fields = Fields::new();
    fields.insert("name".into(), FieldValue::StringValue("Cafe".into()));
    fields.insert("longitude".into(), FieldValue::DoubleValue(-73.99));

    assert_eq!(
        serde_json::to_value(&fields).unwrap(),
        json!({
            "longitude": { "doubleValue": -73.99 },
            "name": { "stringValue": "Cafe" },
        })
    );
}

#[test]
fn query_results_skip_entries_without_documents() {
    let results: Vec<QueryResult> = serde_json::from_value(json!([
        {
            "document": {
                "name": "projects/p/databases/(default)/documents/saved_locations/abc123",
                "fields": {
                    "name": { "stringValue": "Cafe" },
                    "longitude": { "integerValue": "-74" },
                    "latitude": { "doubleValue": 40.73 },
                    "createdAt": { "timestampValue": "2024-05-01T12:00:00.123456Z" },
                    "note": { "nullValue": null },
                },
                "createTime": "2024-05-01T12:00:00.123456Z",
            },
            "readTime": "2024-05-02T00:00:00Z",
        },
        { "readTime": "2024-05-02T00:00:00Z" },
    ]))
    .unwrap();

    let documents = parse_query_results(results);
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, "abc123");
    assert_eq!(documents[0].fields["longitude"].as_f64(), Some(-74.0));
    assert_eq!(documents[0].fields["latitude"].as_f64(), Some(40.73));
    assert!(documents[0].fields[CREATED_AT].as_timestamp().is_some());
}

#[test]
fn document_id_is_last_name_segment() {
    assert_eq!(
        document_id("projects/p/databases/(default)/documents/route_history/xyz").unwrap(),
        "xyz"
    );
    assert!(document_id("projects/p/documents/").is_err());
}

#[test]
fn unsupported_field_types_do_not_hide_other_documents() {
    let results: Vec<QueryResult> = serde_json::from_value(json!([
        {
            "document": {
                "name": "projects/p/databases/(default)/documents/saved_locations/clean",
                "fields": {
                    "name": { "stringValue": "Cafe" },
                    "longitude": { "doubleValue": -73.99 },
                    "latitude": { "doubleValue": 40.73 },
                },
            },
        },
        {
            "document": {
                "name": "projects/p/databases/(default)/documents/saved_locations/mixed",
                "fields": {
                    "name": { "stringValue": "Park" },
                    "longitude": { "doubleValue": -73.97 },
                    "latitude": { "doubleValue": 40.77 },
                    "position": { "geoPointValue": { "latitude": 40.77, "longitude": -73.97 } },
                    "tags": { "arrayValue": { "values": [{ "stringValue": "green" }] } },
                },
            },
        },
    ]))
    .unwrap();

    let documents = parse_query_results(results);
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].id, "clean");
    assert_eq!(documents[1].id, "mixed");
    assert_eq!(documents[1].fields["name"].as_str(), Some("Park"));
    assert!(!documents[1].fields.contains_key("position"));
    assert!(!documents[1].fields.contains_key("tags"));
}
