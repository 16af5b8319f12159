pub mod controller;
pub mod error;
pub mod state;

pub use controller::{TriggerController, TriggerDeps, TriggerOutcome};
pub use error::TriggerError;
pub use state::{TriggerPhase, TriggerSession, TriggerSnapshot};
