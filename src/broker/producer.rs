use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Result;

/// Outcome of a successful produce request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceReceipt {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
}

/// Completion channel of a single produce request
pub type ProduceResponse = oneshot::Receiver<Result<ProduceReceipt>>;

/// Producer subsystem
///
/// Messages with the same non-null key must always land in the same
/// partition; messages with a null key may go to any partition.
/// [`crate::broker::partitioner::compute_partition`] implements this rule.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Submit a message without waiting for it to be written. The returned
    /// channel resolves once the broker accepted or rejected the message.
    fn async_produce(&self, topic: &str, key: Option<Vec<u8>>, value: Vec<u8>) -> ProduceResponse;

    /// Flush pending messages and stop. May block for a while.
    async fn stop(&self);
}
