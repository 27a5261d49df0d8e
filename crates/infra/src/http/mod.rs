//! HTTP client used by job adapters

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
