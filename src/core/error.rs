use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("projection year {year}: {field} is not a finite number; check growth and return inputs")]
    NonFiniteYear { year: u32, field: &'static str },
    #[error("affordability summary: {field} is not a finite number")]
    NonFiniteSummary { field: &'static str },
}
