pub mod controller;
pub mod state;

pub use controller::{ClockOutOutcome, ControllerConfig, SessionController, SessionSnapshot};
pub use state::{SessionPhase, SessionState};
