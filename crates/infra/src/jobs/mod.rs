//! Job function adapters

pub mod http_job;

pub use http_job::HttpJob;
