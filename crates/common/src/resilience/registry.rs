//! Registry of circuit breakers keyed by dependency name
//!
//! One registry is built at startup and handed to every component that calls
//! out to a dependency, so all callers of the same dependency share one
//! breaker without process-wide globals.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerReport, ConfigError};
use super::clock::{Clock, SystemClock};

/// Model identities served from the local host use this prefix
pub const LOCAL_MODEL_PREFIX: &str = "ollama/";

/// Errors from breaker registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Circuit breaker '{name}' is already registered")]
    AlreadyRegistered { name: String },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Shared circuit breakers, one per dependency
pub struct CircuitBreakerRegistry<C: Clock + Clone = SystemClock> {
    breakers: DashMap<String, Arc<CircuitBreaker<C>>>,
    defaults: CircuitBreakerConfig,
    clock: C,
}

impl CircuitBreakerRegistry<SystemClock> {
    /// Create a registry whose ad-hoc breakers use `defaults`
    pub fn new(defaults: CircuitBreakerConfig) -> Result<Self, RegistryError> {
        Self::with_clock(defaults, SystemClock)
    }
}

impl<C: Clock + Clone> CircuitBreakerRegistry<C> {
    /// Create a registry whose breakers all read time from `clock`
    pub fn with_clock(defaults: CircuitBreakerConfig, clock: C) -> Result<Self, RegistryError> {
        defaults.validate()?;
        Ok(Self { breakers: DashMap::new(), defaults, clock })
    }

    /// Register a breaker with an explicit configuration
    pub fn register(&self, config: CircuitBreakerConfig) -> Result<Arc<CircuitBreaker<C>>, RegistryError> {
        let name = config.name.clone();
        match self.breakers.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered { name }),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let breaker = Arc::new(CircuitBreaker::with_clock(config, self.clock.clone())?);
                slot.insert(Arc::clone(&breaker));
                info!(component = "breaker_registry", event = "registered", dependency = %name, "Circuit breaker registered");
                Ok(breaker)
            }
        }
    }

    /// Breaker for `name`, created from the registry defaults on first use
    pub fn get_or_create(&self, name: &str) -> Result<Arc<CircuitBreaker<C>>, RegistryError> {
        let config = CircuitBreakerConfig { name: name.to_string(), ..self.defaults.clone() };
        self.get_or_create_with(config)
    }

    /// Breaker for a model identity, using the local or remote preset
    ///
    /// `ollama/`-prefixed models get the local preset; everything else is
    /// treated as a hosted API.
    pub fn for_model(&self, model: &str) -> Result<Arc<CircuitBreaker<C>>, RegistryError> {
        let config = if model.starts_with(LOCAL_MODEL_PREFIX) {
            CircuitBreakerConfig::local(model)
        } else {
            CircuitBreakerConfig::remote(model)
        };
        self.get_or_create_with(config)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker<C>>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered dependency names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Reports for every breaker, sorted by name
    pub fn reports(&self) -> Vec<CircuitBreakerReport> {
        let mut reports: Vec<CircuitBreakerReport> =
            self.breakers.iter().map(|entry| entry.value().report()).collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }

    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    fn get_or_create_with(&self, config: CircuitBreakerConfig) -> Result<Arc<CircuitBreaker<C>>, RegistryError> {
        if let Some(existing) = self.get(&config.name) {
            return Ok(existing);
        }
        let entry = self.breakers.entry(config.name.clone()).or_try_insert_with(|| {
            CircuitBreaker::with_clock(config, self.clock.clone()).map(Arc::new)
        })?;
        Ok(Arc::clone(entry.value()))
    }
}
