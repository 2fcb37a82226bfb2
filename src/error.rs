use thiserror::Error;

/// Main error type for the proxy coordinator
#[derive(Error, Debug)]
pub enum ProxyError {
    // Availability errors
    #[error("service is shutting down")]
    Unavailable,

    // Request validation errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Acknowledgment routing errors
    #[error("acks channel missing for group={group} topic={topic} partition={partition}")]
    SessionMissing {
        group: String,
        topic: String,
        partition: i32,
    },

    #[error("ack timeout: group={group} topic={topic} partition={partition} offset={offset}")]
    AckTimeout {
        group: String,
        topic: String,
        partition: i32,
        offset: i64,
    },

    // Consumer long-polling errors, callers should back off and retry
    #[error("long polling timeout")]
    RequestTimeout,

    #[error("too many requests pending")]
    BufferOverflow,

    // Broker errors
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Cluster error: {0}")]
    Cluster(String),

    // Construction errors
    #[error("failed to spawn {component}: {source}")]
    Spawn {
        component: &'static str,
        #[source]
        source: Box<ProxyError>,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {}", .0.join("; "))]
    ConfigValidation(Vec<String>),

    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ProxyError {
    /// Wrap a construction failure with the name of the subsystem that caused it.
    pub fn spawn(component: &'static str, source: ProxyError) -> Self {
        ProxyError::Spawn {
            component,
            source: Box::new(source),
        }
    }

    /// Errors the consumer reports during group/topic state transitions.
    /// The request may succeed if re-issued after a short back off.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ProxyError::RequestTimeout | ProxyError::BufferOverflow)
    }
}

/// Result type alias for ProxyError
pub type Result<T> = std::result::Result<T, ProxyError>;
