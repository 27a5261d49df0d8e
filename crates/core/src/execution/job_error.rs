//! Opaque error returned by units of work

use std::any::Any;
use std::fmt;

use jobwarden_domain::TaskError;

/// Failure of a job function before classification
///
/// Any `std::error::Error` converts into a `JobError` with `?`. The source
/// type name and message are kept for the classifier. A [`TaskError`] that
/// the job already classified itself is preserved as is.
pub struct JobError {
    type_name: String,
    message: String,
    classified: Option<TaskError>,
}

impl JobError {
    /// Error with an explicit type label
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), message: message.into(), classified: None }
    }

    /// Error carrying only a message
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new("JobError", message)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The pre-classified error, if the job produced one
    pub fn classified(&self) -> Option<&TaskError> {
        self.classified.as_ref()
    }
}

impl<E> From<E> for JobError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        let classified = (&error as &dyn Any).downcast_ref::<TaskError>().cloned();
        Self {
            type_name: short_type_name(std::any::type_name::<E>()).to_string(),
            message: error.to_string(),
            classified,
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl fmt::Debug for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobError")
            .field("type_name", &self.type_name)
            .field("message", &self.message)
            .field("classified", &self.classified.as_ref().map(TaskError::code))
            .finish()
    }
}

/// Last path segment of a type name, keeping generic arguments intact
fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
