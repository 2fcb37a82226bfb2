pub mod broker;
pub mod config;
pub mod coordination;
pub mod error;
pub mod logging;
pub mod proxy;

#[cfg(test)]
mod testing;

pub use broker::{
    Admin, Backend, BrokerClient, Consumer, Event, Message, OffsetManagerFactory, ProduceReceipt,
    Producer,
};
pub use config::{AppConfig, ProxyConfig};
pub use coordination::{ComponentState, LifecycleEvent, LifecycleManager, TaskDescriptor};
pub use error::{ProxyError, Result};
pub use logging::{init_logging, LoggingConfig};
pub use proxy::{Ack, Proxy, ProxyRegistry, RoutingKey};
