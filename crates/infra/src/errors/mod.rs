//! Conversions from external infrastructure errors into domain errors.

mod conversions;

pub use conversions::{describe_http_error, describe_http_status, InfraError};
