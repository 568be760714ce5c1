use geo_types::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::entities::{bounds_of, Coordinates};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
}

/// Nearby search results together with the area that frames them all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NearbyPlaces {
    pub category: String,
    pub places: Vec<Place>,
    pub bounds: Option<Rect<f64>>,
}

impl NearbyPlaces {
    pub fn new(category: String, places: Vec<Place>) -> Self {
        let bounds = bounds_of(places.iter().map(|place| Coord::from(place.coordinates)));

        Self {
            category,
            places,
            bounds,
        }
    }
}

#[test]
fn nearby_places_are_framed_by_their_bounds() {
    let place = |lng, lat| Place {
        name: "Cafe".into(),
        address: "Cafe, New York".into(),
        coordinates: Coordinates::new(lng, lat).unwrap(),
    };

    let nearby = NearbyPlaces::new(
        "cafe".into(),
        vec![place(-74.0, 40.7), place(-73.9, 40.8), place(-73.95, 40.6)],
    );

    let bounds = nearby.bounds.unwrap();
    assert_eq!(bounds.min().x, -74.0);
    assert_eq!(bounds.min().y, 40.6);
    assert_eq!(bounds.max().x, -73.9);
    assert_eq!(bounds.max().y, 40.8);

    assert!(NearbyPlaces::new("cafe".into(), vec![]).bounds.is_none());
}
