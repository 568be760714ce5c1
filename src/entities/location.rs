use geo_types::Coord;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_input_message, Error};

pub const DEFAULT_LOCATION_NAME: &str = "Unnamed Location";

/// A longitude/latitude pair in degrees, always finite and in range.
///
/// Serialized as `[longitude, latitude]`; deserialization runs the same
/// validation as [`Coordinates::new`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    longitude: f64,
    latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, Error> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(invalid_input_message("coordinates must be finite numbers"));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(invalid_input_message(
                "longitude must be between -180 and 180",
            ));
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(invalid_input_message("latitude must be between -90 and 90"));
        }

        Ok(Self {
            longitude,
            latitude,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl TryFrom<[f64; 2]> for Coordinates {
    type Error = Error;

    fn try_from([longitude, latitude]: [f64; 2]) -> Result<Self, Self::Error> {
        Coordinates::new(longitude, latitude)
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(coordinates: Coordinates) -> Self {
        [coordinates.longitude, coordinates.latitude]
    }
}

impl From<Coordinates> for Coord<f64> {
    fn from(coordinates: Coordinates) -> Self {
        Coord {
            x: coordinates.longitude,
            y: coordinates.latitude,
        }
    }
}

/// Query-string friendly form, e.g. `?longitude=-73.99&latitude=40.73`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CoordinateParams {
    pub longitude: f64,
    pub latitude: f64,
}

impl TryFrom<CoordinateParams> for Coordinates {
    type Error = Error;

    fn try_from(params: CoordinateParams) -> Result<Self, Self::Error> {
        Coordinates::new(params.longitude, params.latitude)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: Uuid,
    pub name: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub address: String,
}

impl SavedLocation {
    pub fn new(name: String, coordinates: Coordinates, address: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            coordinates,
            address,
        }
    }

    /// The label used when this location is a route endpoint.
    pub fn label(&self) -> &str {
        if self.address.is_empty() {
            &self.name
        } else {
            &self.address
        }
    }
}

/// Falls back to the default name when the user left it out or blank.
pub fn location_name(name: Option<String>) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => DEFAULT_LOCATION_NAME.into(),
    }
}

#[test]
fn coordinates_reject_out_of_range_values() {
    assert!(Coordinates::new(-73.99, 40.73).is_ok());
    assert!(Coordinates::new(180.0, -90.0).is_ok());
    assert!(Coordinates::new(180.5, 0.0).is_err());
    assert!(Coordinates::new(0.0, 91.0).is_err());
    assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
}

#[test]
fn coordinates_serialize_as_longitude_latitude_pair() {
    let coordinates = Coordinates::new(-73.99, 40.73).unwrap();

    let value = serde_json::to_value(coordinates).unwrap();
    assert_eq!(value, serde_json::json!([-73.99, 40.73]));

    let bad: Result<Coordinates, _> = serde_json::from_value(serde_json::json!([200.0, 0.0]));
    assert!(bad.is_err());

    let short: Result<Coordinates, _> = serde_json::from_value(serde_json::json!([1.0]));
    assert!(short.is_err());
}

#[test]
fn saved_location_reads_records_without_address() {
    let location: SavedLocation = serde_json::from_value(serde_json::json!({
        "id": "7d8f5b52-3a4f-4d7e-9f51-8a1b2c3d4e5f",
        "name": "Cafe",
        "coordinates": [-73.99, 40.73],
    }))
    .unwrap();

    assert_eq!(location.address, "");
    assert_eq!(location.label(), "Cafe");
}

#[test]
fn blank_names_fall_back_to_default() {
    assert_eq!(location_name(None), DEFAULT_LOCATION_NAME);
    assert_eq!(location_name(Some("   ".into())), DEFAULT_LOCATION_NAME);
    assert_eq!(location_name(Some("Home".into())), "Home");
}
