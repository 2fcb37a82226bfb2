use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ProxyError, Result};
use crate::logging::LoggingConfig;

/// Name of the cluster used when a request does not specify one
pub const DEFAULT_CLUSTER: &str = "default";

/// Top-level configuration: one proxy per Kafka cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Proxy configurations keyed by cluster name
    pub proxies: HashMap<String, ProxyConfig>,
    /// Cluster that serves requests with no explicit cluster
    pub default_cluster: String,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut proxies = HashMap::new();
        proxies.insert(DEFAULT_CLUSTER.to_string(), ProxyConfig::default());
        Self {
            proxies,
            default_cluster: DEFAULT_CLUSTER.to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration of a single cluster proxy. Immutable once the proxy is spawned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub kafka: KafkaConfig,
    pub client: ClientConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Seed brokers used to bootstrap the cluster connection
    pub seed_peers: Vec<String>,
    /// Kafka protocol version the client should speak
    pub version: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            seed_peers: vec!["localhost:9092".to_string()],
            version: "0.10.2.1".to_string(),
        }
    }
}

/// Connection options handed to the broker client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client_id: String,
    pub dial_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// How often cluster metadata is refreshed
    pub metadata_refresh_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: format!("pixy_{}", Uuid::new_v4().simple()),
            dial_timeout_ms: 30_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            metadata_refresh_ms: 600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Capacity of the producer's request channel
    pub channel_buffer_size: usize,
    pub flush_frequency_ms: u64,
    /// How long the producer may spend flushing pending messages on stop
    pub shutdown_timeout_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 4096,
            flush_frequency_ms: 500,
            shutdown_timeout_ms: 30_000,
        }
    }
}

impl ProducerConfig {
    pub fn flush_frequency(&self) -> Duration {
        Duration::from_millis(self.flush_frequency_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Bound on a fetch wait inside the consumer, and on every ack delivery
    /// attempt made by the proxy
    pub long_polling_timeout_ms: u64,
    /// Capacity of per-partition event channels
    pub channel_buffer_size: usize,
    /// How long an offered message may stay unacknowledged before the
    /// consumer offers it again
    pub ack_timeout_ms: u64,
    pub offsets_commit_interval_ms: u64,
    pub retry_backoff_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            long_polling_timeout_ms: 3_000,
            channel_buffer_size: 64,
            ack_timeout_ms: 300_000,
            offsets_commit_interval_ms: 500,
            retry_backoff_ms: 500,
        }
    }
}

impl ConsumerConfig {
    pub fn long_polling_timeout(&self) -> Duration {
        Duration::from_millis(self.long_polling_timeout_ms)
    }
}

impl ProxyConfig {
    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.kafka.seed_peers.is_empty() {
            errors.push("kafka.seed_peers must not be empty".to_string());
        }
        if self.kafka.seed_peers.iter().any(|p| p.trim().is_empty()) {
            errors.push("kafka.seed_peers must not contain blank addresses".to_string());
        }
        if self.client.client_id.trim().is_empty() {
            errors.push("client.client_id must not be empty".to_string());
        }
        if self.consumer.long_polling_timeout_ms == 0 {
            errors.push("consumer.long_polling_timeout_ms must be positive".to_string());
        }
        if self.consumer.channel_buffer_size == 0 {
            errors.push("consumer.channel_buffer_size must be positive".to_string());
        }
        if self.producer.channel_buffer_size == 0 {
            errors.push("producer.channel_buffer_size must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config = Self::build(config_dir.as_ref())?;
        config.validate().map_err(ProxyError::ConfigValidation)?;
        Ok(config)
    }

    fn build(config_dir: &Path) -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("default_cluster", DEFAULT_CLUSTER)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("BROKER_PROXY_ENV")
                        .unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (BROKER_PROXY__DEFAULT_CLUSTER, etc.)
            .add_source(
                Environment::with_prefix("BROKER_PROXY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration of the default cluster's proxy
    pub fn default_proxy(&self) -> Option<&ProxyConfig> {
        self.proxies.get(&self.default_cluster)
    }

    /// Validate configuration values of every cluster
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.proxies.is_empty() {
            errors.push("at least one proxy must be configured".to_string());
        } else if !self.proxies.contains_key(&self.default_cluster) {
            errors.push(format!(
                "default cluster {:?} has no proxy configuration",
                self.default_cluster
            ));
        }

        let mut clusters: Vec<_> = self.proxies.iter().collect();
        clusters.sort_by(|a, b| a.0.cmp(b.0));
        for (cluster, proxy) in clusters {
            if let Err(proxy_errors) = proxy.validate() {
                errors.extend(proxy_errors.into_iter().map(|e| format!("{cluster}: {e}")));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
