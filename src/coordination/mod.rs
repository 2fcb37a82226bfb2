//! Coordination infrastructure shared by the cluster proxies:
//! - Named background tasks
//! - Lifecycle tracking for ordered startup/shutdown

pub mod lifecycle;
pub mod task;

pub use lifecycle::{ComponentState, LifecycleEvent, LifecycleManager};
pub use task::TaskDescriptor;
