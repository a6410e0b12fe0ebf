//! Flight dispatch for VoicePilot.
//!
//! A `Dispatcher` re-checks each normalized `Command` against the safety
//! envelope and maps it onto primitive calls of a `FlightController`. The
//! workspace ships a call-recording mock and a pose-tracking simulator; a
//! real autopilot link would be a third `FlightController` impl.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod mock;
pub mod motion;
pub mod safety;
pub mod sim;

// Re-export key types for convenience
pub use config::{FlightConfig, FlightConfigError};
pub use controller::FlightController;
pub use dispatch::{DispatchReport, Dispatcher};
pub use error::{FlightError, FlightResult};
pub use mock::{FlightCall, MockFlightController};
pub use motion::VelocityNed;
pub use sim::{SimulatedVehicle, VehicleState};
