pub mod provider;
pub mod tracker;

pub use provider::{
    Coordinates, LocationFault, LocationProvider, PermissionStatus, StaticLocationProvider,
};
pub use tracker::{LocationSnapshot, LocationTracker};
