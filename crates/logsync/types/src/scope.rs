//! Sync scope and the per-cluster pipeline switch

use serde::{Deserialize, Serialize};
use std::fmt;

/// The slice of the cluster one syncer instance owns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Cluster whose pipeline deployment gates the sync
    pub cluster: String,

    /// Restrict to one namespace; `None` covers all namespaces
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Scope {
    /// Every namespace of a cluster
    pub fn cluster(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: None,
        }
    }

    pub fn namespace(cluster: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.namespace.as_deref().map_or(true, |ns| ns == namespace)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", self.cluster, ns),
            None => write!(f, "{}", self.cluster),
        }
    }
}

/// Per-cluster pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPipeline {
    pub cluster_name: String,

    /// Whether pipeline execution is deployed in the cluster
    #[serde(default)]
    pub deploy: bool,
}

impl ClusterPipeline {
    pub fn new(cluster_name: impl Into<String>, deploy: bool) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            deploy,
        }
    }
}
