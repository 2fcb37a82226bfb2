//! Component Lifecycle Tracking
//!
//! Records the state of every subsystem a proxy owns and broadcasts state
//! changes, so the order in which components start and stop is observable.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// Component lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    /// Component is being constructed
    Starting,
    /// Component is serving requests
    Running,
    /// Component no longer admits requests and is being stopped
    Stopping,
    /// Component is stopped
    Stopped,
    /// Component failed to start
    Failed,
}

impl ComponentState {
    /// Check if component can accept work
    pub fn can_work(&self) -> bool {
        matches!(self, ComponentState::Running)
    }

    /// Check if component is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComponentState::Stopped | ComponentState::Failed)
    }
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentState::Starting => write!(f, "starting"),
            ComponentState::Running => write!(f, "running"),
            ComponentState::Stopping => write!(f, "stopping"),
            ComponentState::Stopped => write!(f, "stopped"),
            ComponentState::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle events broadcast to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Component state changed
    StateChanged {
        component: String,
        from: ComponentState,
        to: ComponentState,
    },
    /// Shutdown initiated
    ShutdownInitiated,
    /// Shutdown completed
    ShutdownCompleted { duration_ms: u64 },
}

#[derive(Debug, Clone)]
struct ComponentInfo {
    state: ComponentState,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Tracks the lifecycle of the components owned by one proxy
#[derive(Clone)]
pub struct LifecycleManager {
    owner: Arc<str>,
    components: Arc<RwLock<HashMap<String, ComponentInfo>>>,
    event_tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleManager {
    pub fn new(owner: &str) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            owner: owner.into(),
            components: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.event_tx.subscribe()
    }

    /// Get component state
    pub async fn get_state(&self, name: &str) -> Option<ComponentState> {
        let components = self.components.read().await;
        components.get(name).map(|c| c.state)
    }

    /// Get all component states
    pub async fn get_all_states(&self) -> HashMap<String, ComponentState> {
        let components = self.components.read().await;
        components
            .iter()
            .map(|(k, v)| (k.clone(), v.state))
            .collect()
    }

    /// Error recorded when the component failed, if any
    pub async fn last_error(&self, name: &str) -> Option<String> {
        let components = self.components.read().await;
        components.get(name).and_then(|c| c.last_error.clone())
    }

    /// Update component state, registering the component on first use
    pub async fn set_state(&self, name: &str, state: ComponentState) {
        let from = {
            let mut components = self.components.write().await;
            let component = components.entry(name.to_string()).or_insert_with(|| {
                debug!(proxy = %self.owner, component = name, "registered component");
                ComponentInfo {
                    state: ComponentState::Starting,
                    started_at: None,
                    stopped_at: None,
                    last_error: None,
                }
            });
            let from = component.state;
            component.state = state;

            if state == ComponentState::Running {
                component.started_at = Some(Utc::now());
            } else if state.is_terminal() {
                component.stopped_at = Some(Utc::now());
            }
            from
        };

        let _ = self.event_tx.send(LifecycleEvent::StateChanged {
            component: name.to_string(),
            from,
            to: state,
        });

        info!(proxy = %self.owner, "Component {} state: {} -> {}", name, from, state);
    }

    /// Mark component as failed
    pub async fn mark_failed(&self, name: &str, error: &str) {
        {
            let mut components = self.components.write().await;
            if let Some(component) = components.get_mut(name) {
                component.last_error = Some(error.to_string());
            }
        }
        self.set_state(name, ComponentState::Failed).await;
    }

    /// Time the component spent running, if it has both started and stopped
    pub async fn uptime(&self, name: &str) -> Option<chrono::Duration> {
        let components = self.components.read().await;
        let component = components.get(name)?;
        Some(component.stopped_at? - component.started_at?)
    }

    pub fn notify(&self, event: LifecycleEvent) {
        let _ = self.event_tx.send(event);
    }
}
