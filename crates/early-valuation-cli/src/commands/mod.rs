pub mod exit_value;
pub mod profile;
pub mod reference;
