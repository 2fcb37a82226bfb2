use async_trait::async_trait;
use std::sync::Arc;

use super::admin::Admin;
use super::client::{BrokerClient, OffsetManagerFactory};
use super::consumer::Consumer;
use super::producer::Producer;
use crate::config::ProxyConfig;
use crate::coordination::TaskDescriptor;
use crate::error::Result;

/// Wires up the subsystems of a cluster proxy.
///
/// The proxy calls these in dependency order: client, offset manager
/// factory, producer, consumer, admin. Every subsystem is spawned under the
/// proxy's own task descriptor.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Connect to the cluster through `cfg.kafka.seed_peers`.
    async fn connect_client(&self, cfg: &ProxyConfig) -> Result<Arc<dyn BrokerClient>>;

    fn spawn_offset_manager_factory(
        &self,
        parent: &TaskDescriptor,
        cfg: &ProxyConfig,
        client: Arc<dyn BrokerClient>,
    ) -> Arc<dyn OffsetManagerFactory>;

    async fn spawn_producer(
        &self,
        parent: &TaskDescriptor,
        cfg: &ProxyConfig,
    ) -> Result<Arc<dyn Producer>>;

    async fn spawn_consumer(
        &self,
        parent: &TaskDescriptor,
        cfg: &ProxyConfig,
        offset_mgr_f: Arc<dyn OffsetManagerFactory>,
    ) -> Result<Arc<dyn Consumer>>;

    async fn spawn_admin(&self, parent: &TaskDescriptor, cfg: &ProxyConfig)
        -> Result<Arc<dyn Admin>>;
}
