pub mod directions;
pub mod locations;
pub mod places;
pub mod remote_locations;
