//! Container error types.

use thiserror::Error;

/// Container-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Container-wide error type.
///
/// An unknown service name is never represented here: absence is reported
/// as `Ok(None)` by [`Container::get`](crate::Container::get).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Circular dependency detected: {chain}")]
    CircularDependency { chain: String },

    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service {name} is not of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("Service {service} requires dependency {dependency}, which resolved to nothing")]
    MissingDependency { service: String, dependency: String },

    #[error("Class {class} has no {constructor} constructor")]
    ConstructorUnavailable {
        class: String,
        constructor: &'static str,
    },

    #[error("Failed to construct {class}: {source}")]
    Construction {
        class: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Wrap an arbitrary constructor failure for `class`.
    pub fn construction(
        class: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Construction {
            class: class.into(),
            source: source.into(),
        }
    }

    pub(crate) fn type_mismatch<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Whether this error was caused by a dependency cycle.
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}
