//! One proxy per configured cluster, with a default cluster for requests
//! that do not name one.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use super::proxy::Proxy;
use crate::broker::Backend;
use crate::config::AppConfig;
use crate::coordination::TaskDescriptor;
use crate::error::{ProxyError, Result};

pub struct ProxyRegistry {
    proxies: HashMap<String, Arc<Proxy>>,
    default_cluster: String,
}

impl ProxyRegistry {
    /// Spawn a proxy for every configured cluster.
    ///
    /// If any proxy fails to spawn, the ones already spawned are stopped
    /// before the error is returned.
    pub async fn spawn(cfg: &AppConfig, backend: &dyn Backend) -> Result<Self> {
        cfg.validate().map_err(ProxyError::ConfigValidation)?;

        let root = TaskDescriptor::root("proxy");
        let mut clusters: Vec<_> = cfg.proxies.iter().collect();
        clusters.sort_by(|a, b| a.0.cmp(b.0));

        let mut proxies = HashMap::with_capacity(clusters.len());
        for (cluster, proxy_cfg) in clusters {
            match Proxy::spawn(&root, cluster, proxy_cfg.clone(), backend).await {
                Ok(proxy) => {
                    proxies.insert(cluster.clone(), Arc::new(proxy));
                }
                Err(e) => {
                    error!(cluster = %cluster, error = %e, "failed to spawn cluster proxy");
                    stop_all(proxies.values()).await;
                    return Err(e);
                }
            }
        }

        info!(
            clusters = proxies.len(),
            default_cluster = %cfg.default_cluster,
            "all cluster proxies started"
        );
        Ok(Self {
            proxies,
            default_cluster: cfg.default_cluster.clone(),
        })
    }

    /// Proxy of `cluster`, or of the default cluster when `None`.
    pub fn get(&self, cluster: Option<&str>) -> Result<Arc<Proxy>> {
        let cluster = cluster.unwrap_or(&self.default_cluster);
        self.proxies
            .get(cluster)
            .cloned()
            .ok_or_else(|| ProxyError::UnknownCluster(cluster.to_string()))
    }

    pub fn default_cluster(&self) -> &str {
        &self.default_cluster
    }

    /// Names of all clusters, sorted
    pub fn clusters(&self) -> Vec<&str> {
        let mut clusters: Vec<&str> = self.proxies.keys().map(String::as_str).collect();
        clusters.sort_unstable();
        clusters
    }

    /// Stop all cluster proxies concurrently.
    pub async fn stop(&self) {
        stop_all(self.proxies.values()).await;
        info!("all cluster proxies stopped");
    }
}

async fn stop_all<'a>(proxies: impl Iterator<Item = &'a Arc<Proxy>>) {
    join_all(proxies.map(|proxy| proxy.stop())).await;
}
