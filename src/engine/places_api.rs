use super::Engine;

use async_trait::async_trait;

use crate::{
    api::PlacesAPI,
    entities::{Coordinates, NearbyPlaces, Place},
    error::{invalid_input_message, user_facing_error, Error},
};

#[async_trait]
impl PlacesAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn search_place(&self, query: String) -> Result<Place, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(invalid_input_message("Please enter a place to search for"));
        }

        self.maps
            .geocode(query)
            .await
            .map_err(|err| {
                tracing::error!(%err, "error searching for place");
                user_facing_error("Error searching for place. Please try again.")
            })?
            .ok_or_else(|| user_facing_error("No results found"))
    }

    #[tracing::instrument(skip(self))]
    async fn find_nearby(
        &self,
        category: String,
        center: Coordinates,
    ) -> Result<NearbyPlaces, Error> {
        let category = category.trim().to_string();
        if category.is_empty() {
            return Err(invalid_input_message("Please choose a category"));
        }

        let places = self
            .maps
            .search_nearby(&category, center)
            .await
            .map_err(|err| {
                tracing::error!(%err, "error finding nearby places");
                user_facing_error("Error finding nearby places. Please try again.")
            })?;

        if places.is_empty() {
            return Err(user_facing_error(format!("No {} found nearby", category)));
        }

        Ok(NearbyPlaces::new(category, places))
    }

    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, Error> {
        Ok(self.maps.reverse_geocode(coordinates).await)
    }
}

#[cfg(test)]
mod tests {
    use crate::api::PlacesAPI;
    use crate::engine::test_support::engine_with;
    use crate::entities::Coordinates;
    use crate::testing::FakeMapProvider;

    fn center() -> Coordinates {
        Coordinates::new(-74.0, 40.7).unwrap()
    }

    #[tokio::test]
    async fn search_returns_first_match_or_user_message() {
        let maps = FakeMapProvider::default().with_place("blue bottle", "Blue Bottle", -73.99, 40.73);
        let (engine, _) = engine_with(maps).await;

        let place = engine.search_place("  blue bottle ".into()).await.unwrap();
        assert_eq!(place.name, "Blue Bottle");

        let err = engine.search_place("nowhere".into()).await.unwrap_err();
        assert_eq!(err.message, "No results found");

        let err = engine.search_place("   ".into()).await.unwrap_err();
        assert_eq!(err.code, 101);
    }

    #[tokio::test]
    async fn provider_failures_become_readable_messages() {
        let maps = FakeMapProvider {
            failing: true,
            ..Default::default()
        };
        let (engine, _) = engine_with(maps).await;

        let err = engine.search_place("cafe".into()).await.unwrap_err();
        assert_eq!(err.code, 103);
        assert_eq!(err.message, "Error searching for place. Please try again.");

        let err = engine.find_nearby("cafe".into(), center()).await.unwrap_err();
        assert_eq!(err.message, "Error finding nearby places. Please try again.");
    }

    #[tokio::test]
    async fn nearby_reports_empty_categories() {
        let (engine, _) = engine_with(FakeMapProvider::default()).await;

        let err = engine.find_nearby("museum".into(), center()).await.unwrap_err();
        assert_eq!(err.message, "No museum found nearby");
    }

    #[tokio::test]
    async fn nearby_returns_places_with_bounds() {
        let seed = FakeMapProvider::default()
            .with_place("a", "Cafe A", -74.0, 40.7)
            .with_place("b", "Cafe B", -73.9, 40.8);
        let maps = FakeMapProvider {
            nearby: seed.places.values().cloned().collect(),
            ..Default::default()
        };
        let (engine, _) = engine_with(maps).await;

        let nearby = engine.find_nearby("cafe".into(), center()).await.unwrap();
        assert_eq!(nearby.places.len(), 2);
        assert!(nearby.bounds.is_some());
    }

    #[tokio::test]
    async fn reverse_geocode_falls_back_to_unknown() {
        let (engine, _) = engine_with(FakeMapProvider::default()).await;

        assert_eq!(
            engine.reverse_geocode(center()).await.unwrap(),
            "Unknown location"
        );
    }
}
