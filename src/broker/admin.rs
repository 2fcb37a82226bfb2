use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Offset range of a partition along with the offset committed by a group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOffset {
    pub partition: i32,
    pub begin: i64,
    pub end: i64,
    pub count: i64,
    pub offset: i64,
    pub lag: i64,
    pub metadata: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMetadata {
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub version: i32,
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMetadata {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<TopicConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub partitions: Vec<PartitionMetadata>,
}

/// client-id -> consumed partitions
pub type TopicConsumers = HashMap<String, Vec<i32>>;

/// Admin subsystem: offsets, consumer group introspection and topic metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Admin: Send + Sync {
    async fn get_group_offsets(&self, group: &str, topic: &str) -> Result<Vec<PartitionOffset>>;

    async fn set_group_offsets(
        &self,
        group: &str,
        topic: &str,
        offsets: Vec<PartitionOffset>,
    ) -> Result<()>;

    async fn get_topic_consumers(&self, group: &str, topic: &str) -> Result<TopicConsumers>;

    /// Scans every consumer group registered in the cluster.
    async fn get_all_topic_consumers(&self, topic: &str)
        -> Result<HashMap<String, TopicConsumers>>;

    async fn list_topics(
        &self,
        with_partitions: bool,
        with_config: bool,
    ) -> Result<Vec<TopicMetadata>>;

    async fn get_topic_metadata(
        &self,
        topic: &str,
        with_partitions: bool,
        with_config: bool,
    ) -> Result<TopicMetadata>;

    async fn stop(&self);
}
