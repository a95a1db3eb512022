pub mod exit_value;
pub mod stats;
