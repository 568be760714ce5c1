use chrono::{DateTime, Utc};
use geo_types::{Coord, LineString, Rect};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

const METERS_PER_MILE: f64 = 1609.34;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[^>]+(>|$)").unwrap());

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
    Cycling,
    Transit,
}

impl TravelMode {
    /// Routing profile understood by the directions provider. There is no
    /// transit profile, traffic-aware driving stands in for it.
    pub fn profile(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Transit => "driving-traffic",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Transit => "transit",
        }
    }
}

/// A route as returned by the directions provider, before formatting.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderRoute {
    pub distance: f64,
    pub duration: f64,
    pub geometry: LineString<f64>,
    pub steps: Vec<ProviderStep>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProviderStep {
    pub instruction: String,
    pub distance: f64,
}

/// One end of a route: what the user typed (or a label) plus where it is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub label: String,
    pub coordinates: Coordinates,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_miles: String,
    pub duration_minutes: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_miles: String,
}

/// The outcome of one directions request. Held for display only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteQuery {
    pub start: Endpoint,
    pub end: Endpoint,
    pub mode: TravelMode,
    pub distance: f64,
    pub duration: f64,
    pub summary: RouteSummary,
    pub steps: Vec<RouteStep>,
    pub geometry: LineString<f64>,
    pub bounds: Option<Rect<f64>>,
    pub requested_at: DateTime<Utc>,
}

impl RouteQuery {
    pub fn new(start: Endpoint, end: Endpoint, mode: TravelMode, route: ProviderRoute) -> Self {
        let summary = RouteSummary {
            distance_miles: format!("{:.1}", route.distance / METERS_PER_MILE),
            duration_minutes: (route.duration / 60.0).floor().max(0.0) as u64,
        };

        let steps = route
            .steps
            .into_iter()
            .map(|step| RouteStep {
                instruction: strip_html(&step.instruction),
                distance_miles: format!("{:.2}", step.distance / METERS_PER_MILE),
            })
            .collect();

        let bounds = bounds_of(route.geometry.coords().copied());

        Self {
            start,
            end,
            mode,
            distance: route.distance,
            duration: route.duration,
            summary,
            steps,
            geometry: route.geometry,
            bounds,
            requested_at: Utc::now(),
        }
    }
}

pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

/// Smallest rectangle containing every coordinate, `None` when there are none.
pub fn bounds_of(coords: impl IntoIterator<Item = Coord<f64>>) -> Option<Rect<f64>> {
    coords.into_iter().fold(None, |bounds, coord| match bounds {
        None => Some(Rect::new(coord, coord)),
        Some(rect) => Some(Rect::new(
            Coord {
                x: rect.min().x.min(coord.x),
                y: rect.min().y.min(coord.y),
            },
            Coord {
                x: rect.max().x.max(coord.x),
                y: rect.max().y.max(coord.y),
            },
        )),
    })
}

#[cfg(test)]
fn endpoint(label: &str, lng: f64, lat: f64) -> Endpoint {
    Endpoint {
        label: label.into(),
        coordinates: Coordinates::new(lng, lat).unwrap(),
    }
}

#[test]
fn route_query_formats_distance_and_duration() {
    let route = ProviderRoute {
        distance: 16093.4,
        duration: 1259.0,
        geometry: LineString::from(vec![(-74.0, 40.7), (-73.9, 40.8)]),
        steps: vec![ProviderStep {
            instruction: "Turn <b>left</b> onto Main St".into(),
            distance: 804.67,
        }],
    };

    let query = RouteQuery::new(
        endpoint("Home", -74.0, 40.7),
        endpoint("Work", -73.9, 40.8),
        TravelMode::Walking,
        route,
    );

    assert_eq!(query.summary.distance_miles, "10.0");
    assert_eq!(query.summary.duration_minutes, 20);
    assert_eq!(query.steps[0].instruction, "Turn left onto Main St");
    assert_eq!(query.steps[0].distance_miles, "0.50");

    let bounds = query.bounds.unwrap();
    assert_eq!(bounds.min(), Coord { x: -74.0, y: 40.7 });
    assert_eq!(bounds.max(), Coord { x: -73.9, y: 40.8 });
}

#[test]
fn strip_html_removes_unterminated_tags() {
    assert_eq!(strip_html("Head <span class=\"x\">north</span>"), "Head north");
    assert_eq!(strip_html("Arrive <br"), "Arrive ");
}

#[test]
fn transit_uses_traffic_aware_driving_profile() {
    assert_eq!(TravelMode::Transit.profile(), "driving-traffic");
    assert_eq!(TravelMode::Transit.name(), "transit");
    assert_eq!(TravelMode::default(), TravelMode::Driving);

    let mode: TravelMode = serde_json::from_str("\"cycling\"").unwrap();
    assert_eq!(mode.profile(), "cycling");
}
