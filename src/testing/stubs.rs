//! In-memory stand-ins for the cluster subsystems

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::broker::admin::MockAdmin;
use crate::broker::partitioner::compute_partition;
use crate::broker::{
    Admin, Backend, BrokerClient, ConsumeResponse, Consumer, Event, EventSender, Message,
    OffsetManagerFactory, ProduceReceipt, ProduceResponse, Producer,
};
use crate::config::ProxyConfig;
use crate::coordination::TaskDescriptor;
use crate::error::{ProxyError, Result};

/// Order in which stub subsystems were stopped or closed
#[derive(Clone, Default)]
pub struct StopLog(Arc<Mutex<Vec<&'static str>>>);

impl StopLog {
    fn record(&self, component: &'static str) {
        self.0.lock().unwrap().push(component);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

pub struct StubClient {
    peers: Vec<String>,
    closed: AtomicBool,
    log: StopLog,
}

#[async_trait]
impl BrokerClient for StubClient {
    fn brokers(&self) -> Vec<String> {
        self.peers.clone()
    }

    async fn close(&self) {
        assert!(!self.closed.swap(true, Ordering::SeqCst), "client closed twice");
        self.log.record("kafka_client");
    }
}

pub struct StubOffsetMgrFactory {
    log: StopLog,
}

#[async_trait]
impl OffsetManagerFactory for StubOffsetMgrFactory {
    async fn stop(&self) {
        self.log.record("offset_mgr");
    }
}

pub struct StubProducer {
    partitions: i32,
    topics: Vec<String>,
    next_offset: AtomicI64,
    stop_delay: Duration,
    log: StopLog,
}

impl StubProducer {
    pub fn new(topics: &[&str], partitions: i32, log: StopLog) -> Self {
        Self {
            partitions,
            topics: topics.iter().map(|t| t.to_string()).collect(),
            next_offset: AtomicI64::new(0),
            stop_delay: Duration::ZERO,
            log,
        }
    }
}

#[async_trait]
impl Producer for StubProducer {
    fn async_produce(&self, topic: &str, key: Option<Vec<u8>>, value: Vec<u8>) -> ProduceResponse {
        let (tx, rx) = oneshot::channel();
        let result = if self.topics.iter().any(|t| t == topic) {
            Ok(ProduceReceipt {
                topic: topic.to_string(),
                partition: compute_partition(key.as_deref(), self.partitions),
                offset: self.next_offset.fetch_add(1, Ordering::SeqCst),
                key,
                value,
            })
        } else {
            Err(ProxyError::UnknownTopic(topic.to_string()))
        };
        let _ = tx.send(result);
        rx
    }

    async fn stop(&self) {
        tokio::time::sleep(self.stop_delay).await;
        self.log.record("producer");
    }
}

type SessionKey = (String, String, i32);

#[derive(Default)]
struct ConsumerState {
    queues: HashMap<(String, String), VecDeque<(i32, i64, Vec<u8>)>>,
    sessions: HashMap<SessionKey, EventSender>,
    receivers: HashMap<SessionKey, mpsc::Receiver<Event>>,
}

/// Serves queued messages; long polls for `long_polling_timeout` and then
/// fails with `RequestTimeout` when a queue is empty.
pub struct StubConsumer {
    long_polling_timeout: Duration,
    session_buffer: usize,
    state: Mutex<ConsumerState>,
    requests: AtomicUsize,
    log: StopLog,
}

impl StubConsumer {
    pub fn new(long_polling_timeout: Duration, session_buffer: usize, log: StopLog) -> Self {
        Self {
            long_polling_timeout,
            session_buffer,
            state: Mutex::new(ConsumerState::default()),
            requests: AtomicUsize::new(0),
            log,
        }
    }

    pub fn enqueue(&self, group: &str, topic: &str, partition: i32, offset: i64, value: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state
            .queues
            .entry((group.to_string(), topic.to_string()))
            .or_default()
            .push_back((partition, offset, value.to_vec()));
    }

    /// Receiving side of a partition session, created on first consume.
    pub fn take_session(
        &self,
        group: &str,
        topic: &str,
        partition: i32,
    ) -> Option<mpsc::Receiver<Event>> {
        let key = (group.to_string(), topic.to_string(), partition);
        self.state.lock().unwrap().receivers.remove(&key)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Consumer for StubConsumer {
    fn async_consume(&self, group: &str, topic: &str) -> ConsumeResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock().unwrap();

        let next = state
            .queues
            .get_mut(&(group.to_string(), topic.to_string()))
            .and_then(|q| q.pop_front());
        let Some((partition, offset, value)) = next else {
            let timeout = self.long_polling_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let _ = tx.send(Err(ProxyError::RequestTimeout));
            });
            return rx;
        };

        let key = (group.to_string(), topic.to_string(), partition);
        let existing = state.sessions.get(&key).cloned();
        let events = match existing {
            Some(events) => events,
            None => {
                let (events_tx, events_rx) = mpsc::channel(self.session_buffer);
                state.sessions.insert(key.clone(), events_tx.clone());
                state.receivers.insert(key, events_rx);
                events_tx
            }
        };

        let _ = tx.send(Ok(Message {
            topic: topic.to_string(),
            partition,
            offset,
            high_water_mark: offset + 1,
            key: None,
            value,
            events,
        }));
        rx
    }

    async fn stop(&self) {
        self.log.record("consumer");
    }
}

/// Admin mock that only expects to be stopped
pub fn stoppable_admin(log: StopLog) -> MockAdmin {
    let mut admin = MockAdmin::new();
    admin.expect_stop().returning(move || log.record("admin"));
    admin
}

/// Subsystem a [`StubBackend`] should fail to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Client,
    Producer,
    Consumer,
    Admin,
}

pub struct StubBackend {
    pub log: StopLog,
    pub producer: Arc<StubProducer>,
    pub consumer: Arc<StubConsumer>,
    admin: Mutex<Option<Arc<dyn Admin>>>,
    fail_at: Option<FailAt>,
    spawned: Mutex<Vec<&'static str>>,
}

impl StubBackend {
    pub fn new(long_polling_timeout: Duration) -> Self {
        let log = StopLog::default();
        Self {
            producer: Arc::new(StubProducer::new(&["t1", "t2"], 8, log.clone())),
            consumer: Arc::new(StubConsumer::new(long_polling_timeout, 4, log.clone())),
            admin: Mutex::new(Some(Arc::new(stoppable_admin(log.clone())))),
            fail_at: None,
            spawned: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn failing_at(mut self, fail_at: FailAt) -> Self {
        self.fail_at = Some(fail_at);
        self
    }

    pub fn with_producer_stop_delay(mut self, delay: Duration) -> Self {
        let mut producer = StubProducer::new(&["t1", "t2"], 8, self.log.clone());
        producer.stop_delay = delay;
        self.producer = Arc::new(producer);
        self
    }

    pub fn with_admin(self, admin: MockAdmin) -> Self {
        *self.admin.lock().unwrap() = Some(Arc::new(admin));
        self
    }

    /// Subsystems created so far, in creation order
    pub fn spawned(&self) -> Vec<&'static str> {
        self.spawned.lock().unwrap().clone()
    }

    fn check(&self, at: FailAt, name: &'static str) -> Result<()> {
        if self.fail_at == Some(at) {
            return Err(ProxyError::Cluster(format!("{name} unavailable")));
        }
        self.spawned.lock().unwrap().push(name);
        Ok(())
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn connect_client(&self, cfg: &ProxyConfig) -> Result<Arc<dyn BrokerClient>> {
        self.check(FailAt::Client, "kafka_client")?;
        Ok(Arc::new(StubClient {
            peers: cfg.kafka.seed_peers.clone(),
            closed: AtomicBool::new(false),
            log: self.log.clone(),
        }))
    }

    fn spawn_offset_manager_factory(
        &self,
        _parent: &TaskDescriptor,
        _cfg: &ProxyConfig,
        _client: Arc<dyn BrokerClient>,
    ) -> Arc<dyn OffsetManagerFactory> {
        self.spawned.lock().unwrap().push("offset_mgr");
        Arc::new(StubOffsetMgrFactory {
            log: self.log.clone(),
        })
    }

    async fn spawn_producer(
        &self,
        _parent: &TaskDescriptor,
        _cfg: &ProxyConfig,
    ) -> Result<Arc<dyn Producer>> {
        self.check(FailAt::Producer, "producer")?;
        Ok(self.producer.clone())
    }

    async fn spawn_consumer(
        &self,
        _parent: &TaskDescriptor,
        _cfg: &ProxyConfig,
        _offset_mgr_f: Arc<dyn OffsetManagerFactory>,
    ) -> Result<Arc<dyn Consumer>> {
        self.check(FailAt::Consumer, "consumer")?;
        Ok(self.consumer.clone())
    }

    async fn spawn_admin(
        &self,
        _parent: &TaskDescriptor,
        _cfg: &ProxyConfig,
    ) -> Result<Arc<dyn Admin>> {
        self.check(FailAt::Admin, "admin")?;
        let admin = self.admin.lock().unwrap().take();
        Ok(admin.unwrap_or_else(|| Arc::new(stoppable_admin(self.log.clone()))))
    }
}
