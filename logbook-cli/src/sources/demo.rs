use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;

use logbook_core::error::StreamError;
use logbook_core::model::{
    ContainerFacts, WorkloadEvent, WorkloadList, WorkloadPhase, WorkloadRecord,
};
use logbook_core::source::{ClusterSource, LogStream, WorkloadStream};

const NAMESPACE: &str = "demo";
const JOB: &str = "report-job-28";

/// Simulated namespace for trying the viewer without a cluster.
///
/// A handful of long-running pods emit log lines on every tick. A batch job
/// cycles through its lifecycle on the watch, and its log ends after a few
/// lines like a finished container's would.
pub struct DemoSource {
    tick_interval: Duration,
}

impl DemoSource {
    pub fn new() -> Self {
        Self {
            tick_interval: Duration::from_millis(600),
        }
    }

    #[cfg(test)]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

fn running_pod(name: &str, containers: &[&str]) -> WorkloadRecord {
    let mut pod = WorkloadRecord::new(name, NAMESPACE);
    pod.phase = Some(WorkloadPhase::Running);
    pod.containers = containers.iter().map(|c| c.to_string()).collect();
    pod.statuses = containers
        .iter()
        .map(|c| ContainerFacts::new(*c).running(true))
        .collect();
    pod
}

fn initial_pods() -> Vec<WorkloadRecord> {
    let mut worker = running_pod("worker-5c6b9", &["worker"]);
    worker.init_containers = vec!["migrate".into()];
    worker.init_statuses = vec![ContainerFacts::new("migrate").terminated(0, "Completed")];

    vec![
        running_pod("api-7d9f8", &["api", "envoy"]),
        worker,
        running_pod("postgres-0", &["postgres"]),
        running_pod("redis-0", &["redis"]),
        job_pod(JobStep::Pending),
    ]
}

#[derive(Clone, Copy)]
enum JobStep {
    Pending,
    Running,
    Succeeded,
    Gone,
}

fn job_pod(step: JobStep) -> WorkloadRecord {
    let mut pod = WorkloadRecord::new(JOB, NAMESPACE);
    pod.containers = vec!["report".into()];
    match step {
        JobStep::Pending => {
            pod.phase = Some(WorkloadPhase::Pending);
            pod.statuses = vec![ContainerFacts::new("report").waiting("ContainerCreating")];
        }
        JobStep::Running => {
            pod.phase = Some(WorkloadPhase::Running);
            pod.statuses = vec![ContainerFacts::new("report").running(true)];
        }
        JobStep::Succeeded | JobStep::Gone => {
            pod.phase = Some(WorkloadPhase::Succeeded);
            pod.statuses = vec![ContainerFacts::new("report").terminated(0, "Completed")];
        }
    }
    pod
}

/// The job's lifecycle as seen on the watch, one event per step.
fn job_event(step: u64) -> WorkloadEvent {
    match step % 4 {
        0 => WorkloadEvent::Modified(job_pod(JobStep::Running)),
        1 => WorkloadEvent::Modified(job_pod(JobStep::Succeeded)),
        2 => WorkloadEvent::Deleted(job_pod(JobStep::Gone)),
        _ => WorkloadEvent::Added(job_pod(JobStep::Pending)),
    }
}

/// Log line for `container` at `tick`, or `None` once its output is over.
fn log_line(container: &str, tick: u64) -> Option<String> {
    let text = match container {
        "api" => {
            if tick % 12 == 7 {
                "[ERROR] Connection refused to upstream service".into()
            } else if tick % 8 == 3 {
                "[WARN] High latency detected: 450ms".into()
            } else {
                let routes = ["GET /health 200", "GET /api/users 200", "POST /api/data 201", "GET /api/status 200"];
                routes[(tick as usize) % routes.len()].into()
            }
        }
        "envoy" => format!(
            "[{}] \"GET /api/users HTTP/1.1\" 200 - {} bytes {}ms",
            tick,
            512 + (tick % 64) * 8,
            3 + tick % 40
        ),
        "worker" => {
            if tick % 10 == 5 {
                format!("[ERROR] Job {} failed: timeout after 30s", tick)
            } else if tick % 7 == 2 {
                format!("[WARN] Queue depth high: {} pending", 50 + (tick % 30))
            } else {
                format!("processed job id={}", tick)
            }
        }
        "migrate" => match tick {
            0 => "applying migration 0041_add_orders_index".into(),
            1 => "applying migration 0042_drop_legacy_sessions".into(),
            2 => "migrations complete".into(),
            _ => return None,
        },
        "postgres" => {
            if tick % 15 == 10 {
                "[WARN] Slow query detected: 1250ms".into()
            } else {
                let msgs = ["checkpoint complete", "autovacuum: processing", "connection accepted"];
                msgs[(tick as usize) % msgs.len()].into()
            }
        }
        "redis" => {
            let keys = 1000 + (tick % 500);
            let mem = 2.0 + (tick % 10) as f32 * 0.1;
            format!("keys: {}, memory: {:.1}MB", keys, mem)
        }
        "report" => {
            if tick >= 12 {
                return None;
            }
            format!("report row {} of 12 written", tick + 1)
        }
        _ => format!("tick {}", tick),
    };
    Some(text)
}

#[async_trait]
impl ClusterSource for DemoSource {
    fn context(&self) -> &str {
        "demo"
    }

    fn default_namespace(&self) -> &str {
        NAMESPACE
    }

    async fn list_workloads(&self, _namespace: &str) -> Result<WorkloadList, StreamError> {
        Ok(WorkloadList {
            items: initial_pods(),
            resource_version: None,
        })
    }

    async fn watch_workloads(
        &self,
        _namespace: &str,
        _resource_version: Option<String>,
    ) -> Result<WorkloadStream, StreamError> {
        let interval = self.tick_interval * 5;
        let events = stream::unfold(0u64, move |step| async move {
            tokio::time::sleep(interval).await;
            Some((Ok(job_event(step)), step + 1))
        });
        Ok(events.boxed())
    }

    async fn stream_logs(
        &self,
        _namespace: &str,
        _workload: &str,
        container: &str,
    ) -> Result<LogStream, StreamError> {
        let interval = self.tick_interval;
        let lines = stream::unfold(
            (0u64, container.to_string()),
            move |(tick, container)| async move {
                tokio::time::sleep(interval).await;
                let line = log_line(&container, tick)?;
                Some((Ok(line), (tick + 1, container)))
            },
        );
        Ok(lines.boxed())
    }
}

#[cfg(test)]
mod tests {
    use logbook_core::lifecycle::{WorkloadStatus, derive_status};

    use super::*;

    #[tokio::test]
    async fn test_initial_listing() {
        let source = DemoSource::new();
        let list = source.list_workloads(NAMESPACE).await.unwrap();
        assert_eq!(list.items.len(), 5);

        let job = list.items.iter().find(|p| p.name == JOB).unwrap();
        assert_eq!(derive_status(job), WorkloadStatus::Pending);
    }

    #[test]
    fn test_job_cycles_through_lifecycle() {
        let statuses: Vec<_> = (0..4)
            .map(|step| match job_event(step) {
                WorkloadEvent::Deleted(_) => None,
                event => Some(derive_status(event.record())),
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                Some(WorkloadStatus::Running),
                Some(WorkloadStatus::Succeeded),
                None,
                Some(WorkloadStatus::Pending),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_finite_logs_end() {
        let source = DemoSource::new().with_tick_interval(Duration::from_millis(10));
        let lines: Vec<_> = source
            .stream_logs(NAMESPACE, "worker-5c6b9", "migrate")
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], Ok("migrations complete".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_running_logs_keep_coming() {
        let source = DemoSource::new();
        let lines: Vec<_> = source
            .stream_logs(NAMESPACE, "api-7d9f8", "api")
            .await
            .unwrap()
            .take(50)
            .collect()
            .await;
        assert_eq!(lines.len(), 50);
        assert!(lines.iter().all(|l| l.is_ok()));
    }
}
