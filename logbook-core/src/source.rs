use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::StreamError;
use crate::model::{WorkloadEvent, WorkloadList};

pub type WorkloadStream = BoxStream<'static, Result<WorkloadEvent, StreamError>>;
pub type LogStream = BoxStream<'static, Result<String, StreamError>>;

/// Where workloads and their logs come from.
///
/// - `KubeSource`: a real cluster through the Kubernetes API
/// - `DemoSource`: simulated workloads and log lines, no cluster needed
///
/// Streams returned here are consumed by supervised tasks; dropping a stream
/// must release its connection.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Human-readable context shown in the status bar (e.g. the cluster name).
    fn context(&self) -> &str;

    /// Namespace used when neither the command line nor the config names one.
    fn default_namespace(&self) -> &str;

    /// Snapshot of every workload in `namespace`.
    async fn list_workloads(&self, namespace: &str) -> Result<WorkloadList, StreamError>;

    /// Changes after `resource_version`, or from now when it is `None`.
    /// The stream ends when the server closes the watch.
    async fn watch_workloads(
        &self,
        namespace: &str,
        resource_version: Option<String>,
    ) -> Result<WorkloadStream, StreamError>;

    /// Follow the log of one container. Ends when the remote closes.
    async fn stream_logs(
        &self,
        namespace: &str,
        workload: &str,
        container: &str,
    ) -> Result<LogStream, StreamError>;
}
