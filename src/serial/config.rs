/*!
 * Serial Queue Configuration
 *
 * Backend selection and worker naming
 */

use crate::core::limits::{BACKEND_ENV_VAR, DEFAULT_WORKER_THREAD_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Dedicated worker thread per queue
    Portable,
    /// Drain jobs on a shared work pool
    WorkQueue,
    /// Worker shared by every queue with the same name
    Named,
    /// Named when a name is configured, otherwise Portable
    #[default]
    Auto,
}

impl BackendType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendType::Portable => "portable",
            BackendType::WorkQueue => "work_queue",
            BackendType::Named => "named",
            BackendType::Auto => "auto",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown serial queue backend '{0}' (expected portable, work_queue, named or auto)")]
pub struct ParseBackendError(String);

impl FromStr for BackendType {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "portable" => Ok(BackendType::Portable),
            "work_queue" | "workqueue" => Ok(BackendType::WorkQueue),
            "named" => Ok(BackendType::Named),
            "auto" => Ok(BackendType::Auto),
            _ => Err(ParseBackendError(s.to_string())),
        }
    }
}

/// Serial queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Preferred backend
    pub backend: BackendType,
    /// Shared queue name (Named backend only)
    pub name: Option<String>,
    /// Name given to dedicated worker threads
    pub thread_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Auto,
            name: None,
            thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
        }
    }
}

impl QueueConfig {
    /// Configuration for a queue sharing its worker with every queue of the same name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            backend: BackendType::Named,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Default configuration with the backend taken from `SERIAL_QUEUE_BACKEND`
    ///
    /// An unset variable keeps `Auto`; an unparsable one is logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(BACKEND_ENV_VAR) {
            match value.parse() {
                Ok(backend) => config.backend = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", BACKEND_ENV_VAR),
            }
        }
        config
    }

    /// Resolve `Auto` (and a nameless `Named`) to a concrete backend
    pub fn select_backend(&self) -> BackendType {
        match (self.backend, self.name.is_some()) {
            (BackendType::Auto, true) | (BackendType::Named, true) => BackendType::Named,
            (BackendType::Auto, false) | (BackendType::Named, false) => BackendType::Portable,
            (other, _) => other,
        }
    }
}
