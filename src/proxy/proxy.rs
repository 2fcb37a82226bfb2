//! Cluster proxy: single entry point for produce, consume and admin requests
//!
//! A `Proxy` owns the broker client and the producer, consumer and admin
//! subsystems of one cluster. Each subsystem reference sits behind its own
//! reader/writer lock: requests take the read lock just long enough to check
//! that the subsystem is present and hand it the request, shutdown takes the
//! write lock once to clear it. An absent subsystem is the only valid
//! post-shutdown state, and every entry point reports it as
//! [`ProxyError::Unavailable`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ack::Ack;
use super::routing::{RoutingKey, RoutingTable};
use crate::broker::{
    Admin, Backend, BrokerClient, Consumer, Event, Message, OffsetManagerFactory, PartitionOffset,
    ProduceReceipt, Producer, TopicConsumers, TopicMetadata,
};
use crate::config::ProxyConfig;
use crate::coordination::{ComponentState, LifecycleEvent, LifecycleManager, TaskDescriptor};
use crate::error::{ProxyError, Result};

pub const KAFKA_CLIENT: &str = "kafka_client";
pub const OFFSET_MGR: &str = "offset_mgr";
pub const PRODUCER: &str = "producer";
pub const CONSUMER: &str = "consumer";
pub const ADMIN: &str = "admin";

type Slot<T> = Arc<RwLock<Option<Arc<T>>>>;

/// Proxy to a particular Kafka cluster
pub struct Proxy {
    task: TaskDescriptor,
    cfg: Arc<ProxyConfig>,
    lifecycle: LifecycleManager,

    kafka_clt: Mutex<Option<Arc<dyn BrokerClient>>>,
    offset_mgr_f: Mutex<Option<Arc<dyn OffsetManagerFactory>>>,

    producer: Slot<dyn Producer>,
    consumer: Slot<dyn Consumer>,
    admin: Slot<dyn Admin>,

    routing: RoutingTable,
}

impl Proxy {
    /// Create a proxy and start its subsystems.
    ///
    /// Subsystems are spawned in dependency order. If one of them fails the
    /// error is returned, and subsystems spawned before it are left running.
    pub async fn spawn(
        parent: &TaskDescriptor,
        name: &str,
        cfg: ProxyConfig,
        backend: &dyn Backend,
    ) -> Result<Self> {
        cfg.validate().map_err(ProxyError::ConfigValidation)?;

        let task = parent.new_child(name);
        let lifecycle = LifecycleManager::new(task.path());

        lifecycle.set_state(KAFKA_CLIENT, ComponentState::Starting).await;
        let kafka_clt = match backend.connect_client(&cfg).await {
            Ok(clt) => clt,
            Err(e) => {
                lifecycle.mark_failed(KAFKA_CLIENT, &e.to_string()).await;
                return Err(ProxyError::spawn("Kafka client", e));
            }
        };
        lifecycle.set_state(KAFKA_CLIENT, ComponentState::Running).await;

        let offset_mgr_f =
            backend.spawn_offset_manager_factory(&task, &cfg, Arc::clone(&kafka_clt));
        lifecycle.set_state(OFFSET_MGR, ComponentState::Running).await;

        lifecycle.set_state(PRODUCER, ComponentState::Starting).await;
        let producer = match backend.spawn_producer(&task, &cfg).await {
            Ok(producer) => producer,
            Err(e) => return Err(fail_spawn(&lifecycle, PRODUCER, e).await),
        };
        lifecycle.set_state(PRODUCER, ComponentState::Running).await;

        lifecycle.set_state(CONSUMER, ComponentState::Starting).await;
        let consumer = match backend
            .spawn_consumer(&task, &cfg, Arc::clone(&offset_mgr_f))
            .await
        {
            Ok(consumer) => consumer,
            Err(e) => return Err(fail_spawn(&lifecycle, CONSUMER, e).await),
        };
        lifecycle.set_state(CONSUMER, ComponentState::Running).await;

        lifecycle.set_state(ADMIN, ComponentState::Starting).await;
        let admin = match backend.spawn_admin(&task, &cfg).await {
            Ok(admin) => admin,
            Err(e) => return Err(fail_spawn(&lifecycle, ADMIN, e).await),
        };
        lifecycle.set_state(ADMIN, ComponentState::Running).await;

        info!(
            proxy = %task,
            brokers = ?kafka_clt.brokers(),
            "proxy started"
        );

        Ok(Self {
            task,
            cfg: Arc::new(cfg),
            lifecycle,
            kafka_clt: Mutex::new(Some(kafka_clt)),
            offset_mgr_f: Mutex::new(Some(offset_mgr_f)),
            producer: Arc::new(RwLock::new(Some(producer))),
            consumer: Arc::new(RwLock::new(Some(consumer))),
            admin: Arc::new(RwLock::new(Some(admin))),
            routing: RoutingTable::new(),
        })
    }

    /// Stop the proxy synchronously.
    ///
    /// Producer, consumer and admin are stopped concurrently; then the offset
    /// manager factory is stopped and the Kafka client closed. Each subsystem
    /// reference is cleared before the subsystem's own (possibly slow) stop
    /// runs, so requests arriving in the meantime fail with `Unavailable`.
    /// Stopping an already stopped proxy does nothing.
    pub async fn stop(&self) {
        let start = Instant::now();
        self.lifecycle.notify(LifecycleEvent::ShutdownInitiated);
        info!(proxy = %self.task, "stopping proxy");

        let stop_tasks = vec![
            self.spawn_stop("prod_stop", PRODUCER, &self.producer, |producer| async move {
                producer.stop().await
            }),
            self.spawn_stop("cons_stop", CONSUMER, &self.consumer, |consumer| async move {
                consumer.stop().await
            }),
            self.spawn_stop("adm_stop", ADMIN, &self.admin, |admin| async move {
                admin.stop().await
            }),
        ];
        for result in join_all(stop_tasks).await {
            if let Err(e) = result {
                error!(proxy = %self.task, error = %e, "subsystem stop task failed");
            }
        }

        let offset_mgr_f = self.offset_mgr_f.lock().await.take();
        if let Some(offset_mgr_f) = offset_mgr_f {
            self.lifecycle.set_state(OFFSET_MGR, ComponentState::Stopping).await;
            offset_mgr_f.stop().await;
            self.lifecycle.set_state(OFFSET_MGR, ComponentState::Stopped).await;
        }

        let kafka_clt = self.kafka_clt.lock().await.take();
        if let Some(kafka_clt) = kafka_clt {
            kafka_clt.close().await;
            self.lifecycle.set_state(KAFKA_CLIENT, ComponentState::Stopped).await;
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        self.lifecycle
            .notify(LifecycleEvent::ShutdownCompleted { duration_ms });
        info!(proxy = %self.task, duration_ms, "proxy stopped");
    }

    fn spawn_stop<T, F, Fut>(
        &self,
        task_name: &str,
        component: &'static str,
        slot: &Slot<T>,
        stop: F,
    ) -> JoinHandle<()>
    where
        T: ?Sized + Send + Sync + 'static,
        F: FnOnce(Arc<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let slot = Arc::clone(slot);
        let lifecycle = self.lifecycle.clone();
        self.task.new_child(task_name).spawn(async move {
            let subsystem = {
                let mut guard = slot.write().await;
                guard.take()
            };
            let Some(subsystem) = subsystem else {
                return;
            };
            lifecycle.set_state(component, ComponentState::Stopping).await;
            stop(subsystem).await;
            lifecycle.set_state(component, ComponentState::Stopped).await;
            if let Some(uptime) = lifecycle.uptime(component).await {
                debug!(component, uptime_ms = uptime.num_milliseconds(), "subsystem stopped");
            }
        })
    }

    /// Submit a message to `topic`, using `key` to pick the destination
    /// partition, and wait for the cluster to accept it.
    ///
    /// Messages with the same key always go to the same partition. If `key`
    /// is `None` the message is placed into an arbitrary partition.
    ///
    /// Errors usually indicate a catastrophic failure of the Kafka cluster, or
    /// a missing topic if the cluster is not configured to auto create topics.
    pub async fn produce(
        &self,
        topic: &str,
        key: Option<Vec<u8>>,
        message: Vec<u8>,
    ) -> Result<ProduceReceipt> {
        let response = {
            let producer = self.producer.read().await;
            let producer = producer.as_ref().ok_or(ProxyError::Unavailable)?;
            producer.async_produce(topic, key, message)
        };

        response
            .await
            .map_err(|_| ProxyError::Internal("producer dropped produce request".to_string()))?
    }

    /// Asynchronous counterpart of [`Proxy::produce`]. Only the availability
    /// check is reported; the outcome of the produce itself is discarded.
    pub async fn async_produce(
        &self,
        topic: &str,
        key: Option<Vec<u8>>,
        message: Vec<u8>,
    ) -> Result<()> {
        let producer = self.producer.read().await;
        let producer = producer.as_ref().ok_or(ProxyError::Unavailable)?;
        drop(producer.async_produce(topic, key, message));
        Ok(())
    }

    /// Consume a message from `topic` on behalf of `group`, optionally
    /// acknowledging a previously consumed message in the same call.
    ///
    /// An explicit `ack` is delivered in the background: if it cannot be
    /// delivered within the long polling timeout the failure is logged and
    /// the consume proceeds regardless. With [`Ack::Auto`] the returned
    /// message is acknowledged before this call returns.
    ///
    /// If there are no new messages the call blocks for the consumer's long
    /// polling timeout and then fails with [`ProxyError::RequestTimeout`].
    /// While a group or topic subscription is changing the call may fail
    /// with `RequestTimeout` or `BufferOverflow` even though messages are
    /// available; back off a bit and repeat the request.
    pub async fn consume(&self, group: &str, topic: &str, ack: Ack) -> Result<Message> {
        if let Ack::Explicit { partition, offset } = ack {
            self.spawn_ack(RoutingKey::new(group, topic, partition), offset);
        }

        let response = {
            let consumer = self.consumer.read().await;
            let consumer = consumer.as_ref().ok_or(ProxyError::Unavailable)?;
            consumer.async_consume(group, topic)
        };

        let msg = response
            .await
            .map_err(|_| ProxyError::Internal("consumer dropped consume request".to_string()))??;

        self.routing.insert(
            RoutingKey::new(group, topic, msg.partition),
            msg.events.clone(),
        );

        if ack == Ack::Auto && msg.events.send(Event::Ack(msg.offset)).await.is_err() {
            warn!(
                kafka.group = group,
                kafka.topic = topic,
                kafka.partition = msg.partition,
                "auto-ack dropped, session closed: offset={}",
                msg.offset
            );
        }
        Ok(msg)
    }

    /// Deliver an ack to the session of `key` in a detached task. The outcome
    /// is only logged.
    fn spawn_ack(&self, key: RoutingKey, offset: i64) {
        let Some(events) = self.routing.get(&key) else {
            debug!(key = %key, offset, "no session to ack");
            return;
        };
        let timeout = self.cfg.consumer.long_polling_timeout();
        self.task.new_child("ack").spawn(async move {
            match tokio::time::timeout(timeout, events.send(Event::Ack(offset))).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!(
                    kafka.group = %key.group,
                    kafka.topic = %key.topic,
                    kafka.partition = key.partition,
                    "ack dropped, session closed: offset={}",
                    offset
                ),
                Err(_) => error!(
                    kafka.group = %key.group,
                    kafka.topic = %key.topic,
                    kafka.partition = key.partition,
                    "ack timeout: offset={}",
                    offset
                ),
            }
        });
    }

    /// Acknowledge a message without consuming a new one, and wait until the
    /// partition session has taken the ack.
    ///
    /// Fails with `Unavailable` once the proxy is stopped, whatever the ack.
    /// Fails with `SessionMissing` if nothing was consumed from the partition
    /// through this proxy, or its session has ended, and with `AckTimeout` if
    /// the session does not take the ack within the long polling timeout.
    pub async fn ack(&self, group: &str, topic: &str, ack: Ack) -> Result<()> {
        if self.consumer.read().await.is_none() {
            return Err(ProxyError::Unavailable);
        }
        let Ack::Explicit { partition, offset } = ack else {
            return Err(ProxyError::InvalidArgument(format!(
                "{ack} cannot be delivered on its own"
            )));
        };

        let key = RoutingKey::new(group, topic, partition);
        let session_missing = || ProxyError::SessionMissing {
            group: group.to_string(),
            topic: topic.to_string(),
            partition,
        };
        let events = self.routing.get(&key).ok_or_else(session_missing)?;

        let timeout = self.cfg.consumer.long_polling_timeout();
        match tokio::time::timeout(timeout, events.send(Event::Ack(offset))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(session_missing()),
            Err(_) => Err(ProxyError::AckTimeout {
                group: group.to_string(),
                topic: topic.to_string(),
                partition,
                offset,
            }),
        }
    }

    async fn admin_handle(&self) -> Result<Arc<dyn Admin>> {
        self.admin.read().await.clone().ok_or(ProxyError::Unavailable)
    }

    /// For every partition of `topic` returns the current offset range along
    /// with the latest offset and metadata committed by `group`.
    pub async fn get_group_offsets(
        &self,
        group: &str,
        topic: &str,
    ) -> Result<Vec<PartitionOffset>> {
        self.admin_handle().await?.get_group_offsets(group, topic).await
    }

    /// Commit offsets along with metadata for partitions of `topic` on behalf
    /// of `group`.
    pub async fn set_group_offsets(
        &self,
        group: &str,
        topic: &str,
        offsets: Vec<PartitionOffset>,
    ) -> Result<()> {
        self.admin_handle()
            .await?
            .set_group_offsets(group, topic, offsets)
            .await
    }

    /// client-id -> consumed partitions, for the members of `group` consuming `topic`.
    pub async fn get_topic_consumers(&self, group: &str, topic: &str) -> Result<TopicConsumers> {
        self.admin_handle().await?.get_topic_consumers(group, topic).await
    }

    /// group -> client-id -> consumed partitions for `topic`.
    ///
    /// Warning: scans every consumer group registered in the cluster and can
    /// therefore take a lot of time.
    pub async fn get_all_topic_consumers(
        &self,
        topic: &str,
    ) -> Result<HashMap<String, TopicConsumers>> {
        self.admin_handle().await?.get_all_topic_consumers(topic).await
    }

    /// All topics existing in the cluster.
    pub async fn list_topics(
        &self,
        with_partitions: bool,
        with_config: bool,
    ) -> Result<Vec<TopicMetadata>> {
        self.admin_handle()
            .await?
            .list_topics(with_partitions, with_config)
            .await
    }

    /// Metadata of `topic`, optionally with partition metadata and/or the
    /// detailed topic configuration.
    pub async fn get_topic_metadata(
        &self,
        topic: &str,
        with_partitions: bool,
        with_config: bool,
    ) -> Result<TopicMetadata> {
        self.admin_handle()
            .await?
            .get_topic_metadata(topic, with_partitions, with_config)
            .await
    }

    pub fn name(&self) -> &str {
        self.task.path()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.cfg
    }

    /// Number of partition sessions acks can currently be routed to
    pub fn session_count(&self) -> usize {
        self.routing.len()
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.lifecycle.subscribe()
    }
}

async fn fail_spawn(
    lifecycle: &LifecycleManager,
    component: &'static str,
    e: ProxyError,
) -> ProxyError {
    lifecycle.mark_failed(component, &e.to_string()).await;
    let running: Vec<String> = lifecycle
        .get_all_states()
        .await
        .into_iter()
        .filter(|(_, state)| state.can_work())
        .map(|(name, _)| name)
        .collect();
    // Already spawned subsystems are not rolled back.
    error!(
        component,
        error = %e,
        left_running = ?running,
        "failed to spawn proxy subsystem"
    );
    ProxyError::spawn(component, e)
}
