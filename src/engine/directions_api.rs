use super::Engine;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    api::{DirectionsAPI, LocationAPI},
    entities::{Coordinates, Endpoint, RouteQuery, TravelMode},
    error::{invalid_input_message, user_facing_error, Error},
    mirror::MirrorTask,
};

const LOCATIONS_NOT_FOUND: &str =
    "Could not find one or both locations. Please try again with more specific names.";

impl Engine {
    async fn geocode_endpoint(&self, query: &str) -> Result<Option<Endpoint>, Error> {
        let place = self.maps.geocode(query).await?;

        Ok(place.map(|place| Endpoint {
            label: query.to_string(),
            coordinates: place.coordinates,
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn route_between(
        &self,
        start: Endpoint,
        end: Endpoint,
        mode: TravelMode,
    ) -> Result<RouteQuery, Error> {
        let route = self
            .maps
            .directions(mode, start.coordinates, end.coordinates)
            .await
            .map_err(|err| {
                tracing::error!(%err, "error getting directions");
                user_facing_error("Error getting directions. Please try again.")
            })?
            .ok_or_else(|| user_facing_error("No route found between these locations"))?;

        let query = RouteQuery::new(start, end, mode, route);

        self.mirror_later(MirrorTask::Route(query.clone()));

        Ok(query)
    }
}

#[async_trait]
impl DirectionsAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn get_directions(
        &self,
        start: String,
        end: String,
        mode: TravelMode,
    ) -> Result<RouteQuery, Error> {
        let (start, end) = (start.trim(), end.trim());
        if start.is_empty() || end.is_empty() {
            return Err(invalid_input_message(
                "Please enter both starting point and destination",
            ));
        }

        let (start, end) = futures::try_join!(self.geocode_endpoint(start), self.geocode_endpoint(end))
            .map_err(|err| {
                tracing::error!(%err, "geocoding error");
                user_facing_error("Error getting directions. Please try again.")
            })?;

        match (start, end) {
            (Some(start), Some(end)) => self.route_between(start, end, mode).await,
            _ => Err(user_facing_error(LOCATIONS_NOT_FOUND)),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn directions_to_saved_location(
        &self,
        id: Uuid,
        origin: Option<String>,
        user_position: Option<Coordinates>,
        mode: TravelMode,
    ) -> Result<RouteQuery, Error> {
        let location = self.find_location(id).await?;

        let end = Endpoint {
            label: location.label().to_string(),
            coordinates: location.coordinates,
        };

        let origin = origin.filter(|origin| !origin.trim().is_empty());

        let start = match (origin, user_position) {
            (Some(origin), _) => self
                .geocode_endpoint(origin.trim())
                .await
                .map_err(|err| {
                    tracing::error!(%err, "geocoding error");
                    user_facing_error("Error getting directions. Please try again.")
                })?
                .ok_or_else(|| user_facing_error(LOCATIONS_NOT_FOUND))?,
            (None, Some(position)) => Endpoint {
                label: self.maps.reverse_geocode(position).await,
                coordinates: position,
            },
            (None, None) => {
                return Err(invalid_input_message(
                    "Please set a starting point or use the \"My Location\" button",
                ))
            }
        };

        self.route_between(start, end, mode).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{DirectionsAPI, LocationAPI};
    use crate::engine::test_support::engine_with;
    use crate::entities::{Coordinates, TravelMode};
    use crate::mirror::{ROUTE_HISTORY, ROUTE_TIMESTAMP};
    use crate::testing::FakeMapProvider;
    use uuid::Uuid;

    fn maps() -> FakeMapProvider {
        FakeMapProvider::default()
            .with_place("home", "Home", -74.0, 40.7)
            .with_place("work", "Work", -73.9, 40.8)
    }

    #[tokio::test]
    async fn directions_between_two_named_places() {
        let (mut engine, collection) = engine_with(maps()).await;

        let route = engine
            .get_directions("home".into(), "work".into(), TravelMode::Cycling)
            .await
            .unwrap();

        assert_eq!(route.start.label, "home");
        assert_eq!(route.end.coordinates, Coordinates::new(-73.9, 40.8).unwrap());
        assert_eq!(route.mode, TravelMode::Cycling);
        assert_eq!(route.summary.distance_miles, "1.0");
        assert_eq!(route.summary.duration_minutes, 5);
        assert_eq!(route.steps[0].instruction, "Drive straight");

        engine.shutdown().await;

        let history = collection.documents(ROUTE_HISTORY);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].fields["mode"].as_str(), Some("cycling"));
        assert_eq!(history[0].fields["startLocation"].as_str(), Some("home"));
        assert_eq!(
            history[0].fields[ROUTE_TIMESTAMP].as_timestamp(),
            Some(route.requested_at)
        );
        assert!(!history[0].fields.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn directions_require_both_endpoints() {
        let (engine, _) = engine_with(maps()).await;

        let err = engine
            .get_directions("home".into(), " ".into(), TravelMode::Driving)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Please enter both starting point and destination");

        let err = engine
            .get_directions("home".into(), "atlantis".into(), TravelMode::Driving)
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Could not find one or both locations"));
    }

    #[tokio::test]
    async fn missing_route_is_reported() {
        let maps = FakeMapProvider {
            no_route: true,
            ..maps()
        };
        let (engine, _) = engine_with(maps).await;

        let err = engine
            .get_directions("home".into(), "work".into(), TravelMode::Walking)
            .await
            .unwrap_err();
        assert_eq!(err.message, "No route found between these locations");
    }

    #[tokio::test]
    async fn directions_to_saved_location_start_from_user_position() {
        let maps = FakeMapProvider {
            reverse: Some("5th Ave, New York".into()),
            ..maps()
        };
        let (engine, _) = engine_with(maps).await;

        let saved = engine
            .save_location(
                Some("Cafe".into()),
                Coordinates::new(-73.99, 40.73).unwrap(),
                Some("Cafe, New York".into()),
            )
            .await
            .unwrap();

        let position = Coordinates::new(-73.98, 40.75).unwrap();
        let route = engine
            .directions_to_saved_location(saved.location.id, None, Some(position), TravelMode::Walking)
            .await
            .unwrap();

        assert_eq!(route.start.label, "5th Ave, New York");
        assert_eq!(route.start.coordinates, position);
        assert_eq!(route.end.label, "Cafe, New York");
        assert_eq!(route.end.coordinates, saved.location.coordinates);

        let route = engine
            .directions_to_saved_location(
                saved.location.id,
                Some("home".into()),
                Some(position),
                TravelMode::Walking,
            )
            .await
            .unwrap();
        assert_eq!(route.start.label, "home");
    }

    #[tokio::test]
    async fn directions_to_saved_location_need_a_start() {
        let (engine, _) = engine_with(maps()).await;

        let saved = engine
            .save_location(
                Some("Cafe".into()),
                Coordinates::new(-73.99, 40.73).unwrap(),
                Some("Cafe, New York".into()),
            )
            .await
            .unwrap();

        let err = engine
            .directions_to_saved_location(saved.location.id, Some("".into()), None, TravelMode::Driving)
            .await
            .unwrap_err();
        assert_eq!(
            err.message,
            "Please set a starting point or use the \"My Location\" button"
        );

        let err = engine
            .directions_to_saved_location(Uuid::new_v4(), None, None, TravelMode::Driving)
            .await
            .unwrap_err();
        assert_eq!(err.code, 102);
    }
}
