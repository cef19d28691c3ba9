//! Workloads and logs from a Kubernetes cluster.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{AsyncBufReadExt, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use kube::api::{ListParams, LogParams, WatchEvent, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::{debug, info, warn};

use logbook_core::error::StreamError;
use logbook_core::model::{
    ContainerFacts, TerminatedFacts, WaitingFacts, WorkloadEvent, WorkloadList, WorkloadPhase,
    WorkloadRecord,
};
use logbook_core::source::{ClusterSource, LogStream, WorkloadStream};

pub struct KubeSource {
    client: Client,
    context: String,
    default_namespace: String,
}

impl KubeSource {
    /// Connect using `kubeconfig`, or the usual inference (`$KUBECONFIG`,
    /// `~/.kube/config`, in-cluster) when no path is given.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self> {
        let (config, context) = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
                let context = kubeconfig.current_context.clone();
                let config =
                    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await
                        .context("failed to load Kubernetes configuration")?;
                (config, context)
            }
            None => {
                let context = Kubeconfig::read()
                    .ok()
                    .and_then(|kubeconfig| kubeconfig.current_context);
                let config = Config::infer()
                    .await
                    .context("failed to infer Kubernetes configuration")?;
                (config, context)
            }
        };

        let context = context.unwrap_or_else(|| config.cluster_url.to_string());
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        info!(%context, %default_namespace, "connected to cluster");

        Ok(Self {
            client,
            context,
            default_namespace,
        })
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn transport(e: kube::Error) -> StreamError {
    StreamError::transport(e.to_string())
}

#[async_trait]
impl ClusterSource for KubeSource {
    fn context(&self) -> &str {
        &self.context
    }

    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn list_workloads(&self, namespace: &str) -> Result<WorkloadList, StreamError> {
        let list = self
            .pods(namespace)
            .list(&ListParams::default())
            .await
            .map_err(transport)?;
        debug!(namespace, pods = list.items.len(), "listed pods");

        Ok(WorkloadList {
            items: list.items.iter().filter_map(pod_to_record).collect(),
            resource_version: list.metadata.resource_version,
        })
    }

    async fn watch_workloads(
        &self,
        namespace: &str,
        resource_version: Option<String>,
    ) -> Result<WorkloadStream, StreamError> {
        let version = resource_version.unwrap_or_else(|| "0".to_string());
        let events = self
            .pods(namespace)
            .watch(&WatchParams::default(), &version)
            .await
            .map_err(transport)?;

        let stream = events
            .map_err(transport)
            .try_filter_map(|event| async move {
                match event {
                    WatchEvent::Added(pod) => Ok(pod_to_record(&pod).map(WorkloadEvent::Added)),
                    WatchEvent::Modified(pod) => {
                        Ok(pod_to_record(&pod).map(WorkloadEvent::Modified))
                    }
                    WatchEvent::Deleted(pod) => {
                        Ok(pod_to_record(&pod).map(WorkloadEvent::Deleted))
                    }
                    WatchEvent::Bookmark(_) => Ok(None),
                    WatchEvent::Error(e) => {
                        warn!(code = e.code, reason = %e.reason, "watch error");
                        Err(StreamError::transport(e.message))
                    }
                }
            });
        Ok(stream.boxed())
    }

    async fn stream_logs(
        &self,
        namespace: &str,
        workload: &str,
        container: &str,
    ) -> Result<LogStream, StreamError> {
        let params = LogParams {
            container: Some(container.to_string()),
            follow: true,
            ..LogParams::default()
        };
        let reader = self
            .pods(namespace)
            .log_stream(workload, &params)
            .await
            .map_err(transport)?;

        let lines = reader
            .lines()
            .map_err(|e| StreamError::transport(e.to_string()));
        Ok(lines.boxed())
    }
}

/// Flatten a pod into the facts the viewer works with. Pods without a name
/// are skipped.
pub fn pod_to_record(pod: &Pod) -> Option<WorkloadRecord> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let mut record = WorkloadRecord::new(name, namespace);
    record.deleting = pod.metadata.deletion_timestamp.is_some();

    if let Some(spec) = &pod.spec {
        record.init_containers = spec
            .init_containers
            .iter()
            .flatten()
            .map(|c| c.name.clone())
            .collect();
        record.containers = spec.containers.iter().map(|c| c.name.clone()).collect();
    }

    if let Some(status) = &pod.status {
        record.phase = status.phase.as_deref().and_then(WorkloadPhase::parse);
        record.reason = status.reason.clone();
        record.init_statuses = status
            .init_container_statuses
            .iter()
            .flatten()
            .map(container_facts)
            .collect();
        record.statuses = status
            .container_statuses
            .iter()
            .flatten()
            .map(container_facts)
            .collect();
    }
    Some(record)
}

fn container_facts(status: &ContainerStatus) -> ContainerFacts {
    let mut facts = ContainerFacts::new(status.name.clone());
    facts.ready = status.ready;

    if let Some(state) = &status.state {
        facts.waiting = state.waiting.as_ref().map(|w| WaitingFacts {
            reason: w.reason.clone().unwrap_or_default(),
        });
        facts.running = state.running.is_some();
        facts.terminated = state.terminated.as_ref().map(|t| TerminatedFacts {
            exit_code: t.exit_code,
            reason: t.reason.clone().unwrap_or_default(),
        });
    }
    facts
}
