use async_trait::async_trait;
use geo_types::LineString;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

use crate::{
    entities::{Coordinates, Place, ProviderRoute, ProviderStep, TravelMode},
    error::{config_error, invalid_input_error, upstream_error, Error},
};

pub const UNKNOWN_LOCATION: &str = "Unknown location";

const NEARBY_LIMIT: u32 = 10;

#[async_trait]
pub trait MapProvider: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<Place>, Error>;

    /// Never fails: any problem resolves to [`UNKNOWN_LOCATION`].
    async fn reverse_geocode(&self, coordinates: Coordinates) -> String;

    async fn search_nearby(
        &self,
        category: &str,
        proximity: Coordinates,
    ) -> Result<Vec<Place>, Error>;

    async fn directions(
        &self,
        mode: TravelMode,
        start: Coordinates,
        end: Coordinates,
    ) -> Result<Option<ProviderRoute>, Error>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Feature {
    text: Option<String>,
    place_name: String,
    center: [f64; 2],
}

impl Feature {
    fn into_place(self) -> Result<Place, Error> {
        let [longitude, latitude] = self.center;
        let coordinates = Coordinates::new(longitude, latitude).map_err(|_| upstream_error())?;

        let name = match self.text {
            Some(text) if !text.is_empty() => text,
            _ => self.place_name.clone(),
        };

        Ok(Place {
            name,
            address: self.place_name,
            coordinates,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Clone, Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
    geometry: RouteGeometry,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Clone, Debug, Deserialize)]
struct RouteGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Clone, Debug, Deserialize)]
struct Step {
    distance: f64,
    maneuver: Maneuver,
}

#[derive(Clone, Debug, Deserialize)]
struct Maneuver {
    instruction: String,
}

impl From<DirectionsRoute> for ProviderRoute {
    fn from(route: DirectionsRoute) -> Self {
        let geometry: LineString<f64> = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[x, y]| (x, y))
            .collect::<Vec<_>>()
            .into();

        // Only the first leg is shown: requests carry exactly two waypoints.
        let steps = route
            .legs
            .into_iter()
            .next()
            .map(|leg| {
                leg.steps
                    .into_iter()
                    .map(|step| ProviderStep {
                        instruction: step.maneuver.instruction,
                        distance: step.distance,
                    })
                    .collect()
            })
            .unwrap_or_default();

        ProviderRoute {
            distance: route.distance,
            duration: route.duration,
            geometry,
            steps,
        }
    }
}

fn first_place(data: GeocodingResponse) -> Result<Option<Place>, Error> {
    data.features
        .into_iter()
        .next()
        .map(Feature::into_place)
        .transpose()
}

fn places(data: GeocodingResponse) -> Result<Vec<Place>, Error> {
    data.features.into_iter().map(Feature::into_place).collect()
}

fn first_route(data: DirectionsResponse) -> Option<ProviderRoute> {
    data.routes.into_iter().next().map(ProviderRoute::from)
}

pub struct MapboxClient {
    client: Client,
    api_base: String,
    access_token: String,
}

impl MapboxClient {
    pub fn new(api_base: String, access_token: String) -> Self {
        Self {
            client: Client::new(),
            api_base,
            access_token,
        }
    }

    /// `https://<base>/<segments...>` with every segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("https://{}/", self.api_base))
            .map_err(|_| config_error("invalid Mapbox API base"))?;

        url.path_segments_mut()
            .map_err(|_| config_error("invalid Mapbox API base"))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    fn places_url(&self, search: &str) -> Result<Url, Error> {
        self.url(&["geocoding", "v5", "mapbox.places", &format!("{}.json", search)])
    }

    fn check_status(res: Response) -> Result<Response, Error> {
        let status_code = res.status().as_u16();

        if (400..500).contains(&status_code) {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(upstream_error());
        }

        Ok(res)
    }

    async fn fetch_places(
        &self,
        search: &str,
        params: &[(&str, String)],
    ) -> Result<GeocodingResponse, Error> {
        let res = self
            .client
            .get(self.places_url(search)?)
            .query(&[("access_token", &self.access_token)])
            .query(params)
            .send()
            .await?;

        let data = Self::check_status(res)?.json().await?;

        Ok(data)
    }
}

#[async_trait]
impl MapProvider for MapboxClient {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<Place>, Error> {
        let data = self.fetch_places(query, &[("limit", "1".into())]).await?;

        first_place(data)
    }

    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(&self, coordinates: Coordinates) -> String {
        let search = format!("{},{}", coordinates.longitude(), coordinates.latitude());

        let result = self
            .fetch_places(&search, &[("limit", "1".into())])
            .await
            .and_then(first_place);

        match result {
            Ok(Some(place)) => place.address,
            Ok(None) => UNKNOWN_LOCATION.into(),
            Err(err) => {
                tracing::warn!(%err, "reverse geocoding failed");
                UNKNOWN_LOCATION.into()
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn search_nearby(
        &self,
        category: &str,
        proximity: Coordinates,
    ) -> Result<Vec<Place>, Error> {
        let proximity = format!("{},{}", proximity.longitude(), proximity.latitude());

        let data = self
            .fetch_places(
                category,
                &[
                    ("proximity", proximity),
                    ("limit", NEARBY_LIMIT.to_string()),
                ],
            )
            .await?;

        places(data)
    }

    #[tracing::instrument(skip(self))]
    async fn directions(
        &self,
        mode: TravelMode,
        start: Coordinates,
        end: Coordinates,
    ) -> Result<Option<ProviderRoute>, Error> {
        let waypoints = format!(
            "{},{};{},{}",
            start.longitude(),
            start.latitude(),
            end.longitude(),
            end.latitude()
        );
        let url = self.url(&["directions", "v5", "mapbox", mode.profile(), &waypoints])?;

        let res = self
            .client
            .get(url)
            .query(&[
                ("steps", "true"),
                ("geometries", "geojson"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let data: DirectionsResponse = Self::check_status(res)?.json().await?;

        Ok(first_route(data))
    }
}

#[test]
fn geocoding_response_prefers_feature_text_for_name() {
    let data: GeocodingResponse = serde_json::from_value(serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            {
                "text": "Blue Bottle",
                "place_name": "Blue Bottle, 1 Main St, New York",
                "center": [-73.99, 40.73],
            },
            {
                "place_name": "Somewhere, New York",
                "center": [-73.98, 40.74],
            },
        ],
    }))
    .unwrap();

    let all = places(data.clone()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].name, "Somewhere, New York");

    let place = first_place(data).unwrap().unwrap();
    assert_eq!(place.name, "Blue Bottle");
    assert_eq!(place.address, "Blue Bottle, 1 Main St, New York");
    assert_eq!(place.coordinates, Coordinates::new(-73.99, 40.73).unwrap());
}

#[test]
fn empty_geocoding_response_has_no_place() {
    let data: GeocodingResponse = serde_json::from_value(serde_json::json!({ "features": [] })).unwrap();
    assert_eq!(first_place(data).unwrap(), None);
}

#[test]
fn directions_response_keeps_first_route_and_leg() {
    let data: DirectionsResponse = serde_json::from_value(serde_json::json!({
        "code": "Ok",
        "routes": [{
            "distance": 3218.68,
            "duration": 600.0,
            "geometry": { "type": "LineString", "coordinates": [[-74.0, 40.7], [-73.99, 40.73]] },
            "legs": [{
                "steps": [
                    { "distance": 100.0, "maneuver": { "instruction": "Head north" } },
                    { "distance": 3118.68, "maneuver": { "instruction": "Arrive" } },
                ],
            }],
        }],
    }))
    .unwrap();

    let route = first_route(data).unwrap();
    assert_eq!(route.distance, 3218.68);
    assert_eq!(route.geometry.0.len(), 2);
    assert_eq!(route.steps.len(), 2);
    assert_eq!(route.steps[0].instruction, "Head north");

    let none: DirectionsResponse = serde_json::from_value(serde_json::json!({ "routes": [] })).unwrap();
    assert!(first_route(none).is_none());
}

#[test]
fn urls_encode_free_text_queries() {
    let client = MapboxClient::new("api.mapbox.com".into(), "token".into());

    let url = client.places_url("Times Square/NYC").unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.mapbox.com/geocoding/v5/mapbox.places/Times%20Square%2FNYC.json"
    );

    let url = client
        .url(&["directions", "v5", "mapbox", TravelMode::Transit.profile(), "-74,40.7;-73.9,40.8"])
        .unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.mapbox.com/directions/v5/mapbox/driving-traffic/-74,40.7;-73.9,40.8"
    );
}
