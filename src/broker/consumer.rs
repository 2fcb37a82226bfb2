use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::Result;

/// Events a caller can deliver to the partition session a message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The message at this offset has been processed
    Ack(i64),
}

/// Send side of a partition session's event channel
pub type EventSender = mpsc::Sender<Event>;

/// A consumed message together with the event channel of its partition session
#[derive(Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub high_water_mark: i64,
    pub key: Option<Vec<u8>>,
    pub value: Vec<u8>,
    pub events: EventSender,
}

/// Completion channel of a single consume request
pub type ConsumeResponse = oneshot::Receiver<Result<Message>>;

/// Consumer subsystem
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Request the next message of `topic` on behalf of `group`. When there is
    /// nothing to consume the channel resolves with
    /// [`ProxyError::RequestTimeout`](crate::error::ProxyError::RequestTimeout)
    /// once the long polling timeout elapses.
    fn async_consume(&self, group: &str, topic: &str) -> ConsumeResponse;

    /// Stop all partition sessions and commit offsets. May block for a while.
    async fn stop(&self);
}
