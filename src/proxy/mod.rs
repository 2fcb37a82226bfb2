//! Cluster proxies
//!
//! A [`Proxy`] multiplexes produce, consume and admin requests onto the
//! subsystems of one Kafka cluster and routes acknowledgements back to the
//! partition sessions consumed messages came from. [`ProxyRegistry`] holds
//! one proxy per configured cluster.

pub mod ack;
pub mod proxy;
pub mod registry;
pub mod routing;


pub use ack::Ack;
pub use proxy::{Proxy, ADMIN, CONSUMER, KAFKA_CLIENT, OFFSET_MGR, PRODUCER};
pub use registry::ProxyRegistry;
pub use routing::{RoutingKey, RoutingTable};
