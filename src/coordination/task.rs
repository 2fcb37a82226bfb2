//! Named background tasks
//!
//! Every background task the proxy starts is spawned through a
//! [`TaskDescriptor`], so its log records carry the full task path
//! (e.g. `proxy/default/cons_stop`).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::Instrument;

/// Hierarchical task name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    path: Arc<str>,
}

impl TaskDescriptor {
    /// Create a root descriptor
    pub fn root(name: &str) -> Self {
        Self { path: name.into() }
    }

    /// Create a descriptor nested under this one
    pub fn new_child(&self, name: &str) -> Self {
        Self {
            path: format!("{}/{}", self.path, name).into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Spawn `fut` on the tokio runtime inside a span named after this task.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let span = tracing::info_span!("task", actor = %self.path);
        tokio::spawn(fut.instrument(span))
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_paths() {
        let root = TaskDescriptor::root("proxy");
        let child = root.new_child("default").new_child("prod_stop");
        assert_eq!(child.path(), "proxy/default/prod_stop");
        assert_eq!(root.to_string(), "proxy");
    }

    #[tokio::test]
    async fn test_spawn_returns_output() {
        let task = TaskDescriptor::root("test").new_child("answer");
        let handle = task.spawn(async { 42 });
        assert_eq!(handle.await.unwrap(), 42);
    }
}
