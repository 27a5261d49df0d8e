//! Error classifier turning raw job failures into [`TaskError`]s

use std::collections::BTreeMap;

use jobwarden_domain::constants::DEFAULT_MAX_RETRIES;
use jobwarden_domain::{TaskError, TaskErrorCode};
use serde_json::Value;
use tracing::info;

use super::rules::{first_match, ClassificationRule, CLASSIFICATION_RULES};
use crate::execution::JobError;

/// Table-driven classifier
///
/// Classification is a pure function of the message, the error type name and
/// the supplied context, so the same input always yields the same code.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: &'static [ClassificationRule],
    max_retries: u32,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl ErrorClassifier {
    /// Classifier stamping `max_retries` onto every error it creates
    pub fn new(max_retries: u32) -> Self {
        Self { rules: CLASSIFICATION_RULES, max_retries }
    }

    /// Replace the rule table
    pub fn with_rules(mut self, rules: &'static [ClassificationRule]) -> Self {
        self.rules = rules;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Classify a job failure
    ///
    /// A job that already returned a [`TaskError`] gets it back unchanged.
    pub fn classify(&self, error: &JobError, context: &BTreeMap<String, Value>) -> TaskError {
        if let Some(task_error) = error.classified() {
            return task_error.clone();
        }
        self.classify_message(error.type_name(), error.message(), context)
    }

    /// Classify from a type name and message
    pub fn classify_message(
        &self,
        error_type: &str,
        message: &str,
        context: &BTreeMap<String, Value>,
    ) -> TaskError {
        let lowered = message.to_lowercase();
        let rule = first_match(self.rules, &lowered);

        let mut task_error = match rule {
            Some(rule) => TaskError::new(rule.code, message),
            None => TaskError::new(TaskErrorCode::UnknownError, message).with_detail("error_type", error_type),
        }
        .with_detail("original_error", message)
        .with_context_map(context)
        .with_max_retries(self.max_retries);

        if let Some(rule) = rule {
            task_error = task_error.with_detail("rule", rule.name);
        }

        info!(
            component = "error_classifier",
            event = "classified",
            code = %task_error.code(),
            rule = rule.map_or("none", |r| r.name),
            retryable = task_error.is_retryable(),
            error_type,
            "Classified task failure"
        );

        task_error
    }
}
