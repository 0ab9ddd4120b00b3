pub mod mission_control;
pub mod telemetry;
