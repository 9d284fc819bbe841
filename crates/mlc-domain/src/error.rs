//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the multi-level cache
///
/// Most public cache operations never surface these errors to callers: they are
/// logged, counted, and degraded to a miss. The variants exist so that the
/// layers below the public surface can report *why* something degraded.
#[derive(Error, Debug)]
pub enum Error {
    /// Distributed tier unreachable or a transport call failed
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Value could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Generic cache operation error
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache error
        message: String,
    },

    /// The active backend does not support the requested operation
    #[error("Unsupported operation on backend {backend}: {operation}")]
    Unsupported {
        /// Backend name
        backend: String,
        /// Operation that was attempted
        operation: String,
    },

    /// A loader failed to produce a value
    #[error("Loader error for key {key}: {message}")]
    Loader {
        /// Key being loaded
        key: String,
        /// Description of the failure
        message: String,
    },

    /// An invalidation rule's matcher or key generator failed
    #[error("Invalidation rule '{rule}' failed: {message}")]
    InvalidationRule {
        /// Rule name
        rule: String,
        /// Description of the failure
        message: String,
    },

    /// An invalidation event could not be built from its wire form
    #[error("Invalid invalidation event: {message}")]
    InvalidEvent {
        /// Description of the problem
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// Basic error creation methods
impl Error {
    /// Create a connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a generic cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported<B: Into<String>, O: Into<String>>(backend: B, operation: O) -> Self {
        Self::Unsupported {
            backend: backend.into(),
            operation: operation.into(),
        }
    }

    /// Create a loader error
    pub fn loader<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::Loader {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an invalidation rule error
    pub fn invalidation_rule<R: Into<String>, S: Into<String>>(rule: R, message: S) -> Self {
        Self::InvalidationRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create an invalid event error
    pub fn invalid_event<S: Into<String>>(message: S) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }
}

// Configuration error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Classification helpers
impl Error {
    /// Whether the error came from the transport to the distributed tier
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Whether the error reports an operation the backend cannot perform
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
