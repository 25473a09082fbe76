pub mod config;
pub mod deadline;
pub mod error;
pub mod optimizer;
pub mod plan;
pub mod planner;
pub mod simulator;
pub mod slot;
pub mod taper;
pub mod tariff;
