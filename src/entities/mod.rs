mod location;
mod place;
mod remote;
mod route;

pub use location::{
    location_name, CoordinateParams, Coordinates, SavedLocation, DEFAULT_LOCATION_NAME,
};
pub use place::{NearbyPlaces, Place};
pub use remote::RemoteLocation;
pub use route::{
    bounds_of, Endpoint, ProviderRoute, ProviderStep, RouteQuery, RouteStep,
    RouteSummary, TravelMode,
};
