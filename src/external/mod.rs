pub mod firestore;
pub mod mapbox;
