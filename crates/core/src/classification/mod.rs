//! Error classification and retry policy
//!
//! - [`rules`]: the prioritized keyword table
//! - [`classifier`]: converts [`JobError`](crate::execution::JobError)s into
//!   typed [`TaskError`](jobwarden_domain::TaskError)s
//! - [`policy`]: retry predicate and exponential backoff

pub mod classifier;
pub mod policy;
pub mod rules;

pub use classifier::ErrorClassifier;
pub use policy::{backoff_delay, should_retry, TaskRetryPolicy};
pub use rules::{ClassificationRule, RuleGroup, CLASSIFICATION_RULES};
