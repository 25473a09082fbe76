/// Inputs the planner refuses to work with.
///
/// Everything else, including an unreachable deadline, is a regular outcome of planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("invalid time of day `{0}`, expected `HH:MM`")]
    InvalidTimeFormat(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
