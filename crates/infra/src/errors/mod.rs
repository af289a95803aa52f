//! Error conversions for infrastructure code

mod conversions;

pub use conversions::InfraError;
