use async_trait::async_trait;

/// Shared connection to the Kafka cluster. Owned by one proxy for its whole
/// lifetime and closed exactly once, after every subsystem has stopped.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Broker addresses the client currently knows about
    fn brokers(&self) -> Vec<String>;

    async fn close(&self);
}

/// Produces per-partition offset trackers for the consumer subsystem.
#[async_trait]
pub trait OffsetManagerFactory: Send + Sync {
    /// Stop all offset managers, committing pending offsets first.
    async fn stop(&self);
}
