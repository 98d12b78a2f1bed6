//! Interactive lesson steps that talk to the server: registering instances on
//! the setup step and simulating limits on the limits step.

mod limits;
mod setup;

pub use limits::{LimitsController, LimitsOutcome, LimitsRequest, LimitsView};
pub use setup::{SetupController, SetupFocus, SetupOutcome, SetupRequest, SetupView};
