mod affordability;
mod engine;
mod error;
mod types;

pub use affordability::{affordability, max_principal_for_payment, monthly_payment};
pub use engine::{Schedules, ensure_finite, project, run_scenario};
pub use error::ProjectionError;
pub use types::{
    AffordabilitySummary, CompensationScheduleEntry, MixScheduleEntry, ProjectionInputs,
    ScenarioResult, YearRecord,
};
