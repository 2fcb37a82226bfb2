//! Contracts of the subsystems a cluster proxy coordinates.
//!
//! The broker client, offset manager, producer, consumer and admin are
//! implemented elsewhere; the proxy only depends on these traits.

pub mod admin;
pub mod backend;
pub mod client;
pub mod consumer;
pub mod partitioner;
pub mod producer;

pub use admin::{
    Admin, PartitionMetadata, PartitionOffset, TopicConfig, TopicConsumers, TopicMetadata,
};
pub use backend::Backend;
pub use client::{BrokerClient, OffsetManagerFactory};
pub use consumer::{ConsumeResponse, Consumer, Event, EventSender, Message};
pub use producer::{ProduceReceipt, ProduceResponse, Producer};
