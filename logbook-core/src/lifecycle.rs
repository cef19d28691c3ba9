//! Coarse lifecycle status of a workload, derived from its container facts.

use std::fmt;

use crate::model::{WorkloadPhase, WorkloadRecord};

const REASON_COMPLETED: &str = "Completed";
const REASON_NODE_LOST: &str = "NodeLost";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadStatus {
    /// Running successfully.
    Running,
    /// Ran to completion (e.g. a finished job).
    Succeeded,
    /// Accepted, but some container images are not created yet.
    Pending,
    /// Being deleted.
    Terminating,
    /// Init containers running, or a container is still coming up.
    Initializing,
    /// An init container failed, or a container exited non-zero.
    Failed,
    Unknown,
}

/// Grouping used to colour workloads in the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Active,
    Pending,
    Error,
}

impl WorkloadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Pending => "Pending",
            Self::Terminating => "Terminating",
            Self::Initializing => "Initializing",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Running | Self::Succeeded => Severity::Active,
            Self::Pending | Self::Initializing | Self::Terminating => Severity::Pending,
            Self::Failed | Self::Unknown => Severity::Error,
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derive the status of `workload`. The first matching rule wins.
pub fn derive_status(workload: &WorkloadRecord) -> WorkloadStatus {
    match workload.phase {
        Some(WorkloadPhase::Succeeded) => return WorkloadStatus::Succeeded,
        Some(WorkloadPhase::Pending) => return WorkloadStatus::Pending,
        Some(WorkloadPhase::Failed) => return WorkloadStatus::Failed,
        Some(WorkloadPhase::Unknown) => return WorkloadStatus::Unknown,
        Some(WorkloadPhase::Running) | None => {}
    }

    for init in &workload.init_statuses {
        match &init.terminated {
            Some(t) if t.exit_code == 0 => continue,
            Some(_) => return WorkloadStatus::Failed,
            None => return WorkloadStatus::Initializing,
        }
    }

    // Later containers override earlier ones, so scan from the back.
    let mut has_completed = false;
    let mut has_running = false;
    for container in workload.statuses.iter().rev() {
        if container
            .waiting
            .as_ref()
            .is_some_and(|w| !w.reason.is_empty())
        {
            return WorkloadStatus::Initializing;
        } else if let Some(t) = &container.terminated {
            if t.reason == REASON_COMPLETED {
                has_completed = true;
            } else {
                return WorkloadStatus::Failed;
            }
        } else if container.ready && container.running {
            has_running = true;
        }
    }
    if has_completed && has_running {
        return WorkloadStatus::Running;
    }

    if workload.deleting {
        if workload.reason.as_deref() == Some(REASON_NODE_LOST) {
            return WorkloadStatus::Unknown;
        }
        return WorkloadStatus::Terminating;
    }
    WorkloadStatus::Running
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerFacts;

    fn running_pod() -> WorkloadRecord {
        let mut w = WorkloadRecord::new("web-0", "default");
        w.phase = Some(WorkloadPhase::Running);
        w
    }

    #[test]
    fn test_phase_wins_over_containers() {
        let mut w = running_pod();
        w.phase = Some(WorkloadPhase::Succeeded);
        w.statuses = vec![ContainerFacts::new("app").terminated(1, "Error")];
        w.deleting = true;
        assert_eq!(derive_status(&w), WorkloadStatus::Succeeded);

        w.phase = Some(WorkloadPhase::Pending);
        assert_eq!(derive_status(&w), WorkloadStatus::Pending);
        w.phase = Some(WorkloadPhase::Failed);
        assert_eq!(derive_status(&w), WorkloadStatus::Failed);
        w.phase = Some(WorkloadPhase::Unknown);
        assert_eq!(derive_status(&w), WorkloadStatus::Unknown);
    }

    #[test]
    fn test_init_container_still_running() {
        let mut w = running_pod();
        w.init_statuses = vec![
            ContainerFacts::new("fetch").terminated(0, "Completed"),
            ContainerFacts::new("migrate").running(false),
            ContainerFacts::new("warm").terminated(2, "Error"),
        ];
        assert_eq!(derive_status(&w), WorkloadStatus::Initializing);
    }

    #[test]
    fn test_init_container_failed() {
        let mut w = running_pod();
        w.init_statuses = vec![
            ContainerFacts::new("fetch").terminated(0, "Completed"),
            ContainerFacts::new("migrate").terminated(1, "Error"),
        ];
        assert_eq!(derive_status(&w), WorkloadStatus::Failed);
    }

    #[test]
    fn test_completed_sidecar_with_running_main() {
        let mut w = running_pod();
        w.init_statuses = vec![ContainerFacts::new("fetch").terminated(0, "Completed")];
        w.statuses = vec![
            ContainerFacts::new("app").running(true),
            ContainerFacts::new("setup").terminated(0, "Completed"),
        ];
        assert_eq!(derive_status(&w), WorkloadStatus::Running);
    }

    #[test]
    fn test_completed_and_running_beats_deletion() {
        let mut w = running_pod();
        w.statuses = vec![
            ContainerFacts::new("app").running(true),
            ContainerFacts::new("setup").terminated(0, "Completed"),
        ];
        w.deleting = true;
        assert_eq!(derive_status(&w), WorkloadStatus::Running);
    }

    #[test]
    fn test_reverse_scan_short_circuits() {
        // The last container is scanned first; its failure wins even though
        // an earlier container is still waiting.
        let mut w = running_pod();
        w.statuses = vec![
            ContainerFacts::new("app").waiting("ContainerCreating"),
            ContainerFacts::new("sidecar").terminated(137, "OOMKilled"),
        ];
        assert_eq!(derive_status(&w), WorkloadStatus::Failed);

        w.statuses.reverse();
        assert_eq!(derive_status(&w), WorkloadStatus::Initializing);
    }

    #[test]
    fn test_waiting_without_reason_is_ignored() {
        let mut w = running_pod();
        w.statuses = vec![ContainerFacts::new("app").waiting("")];
        assert_eq!(derive_status(&w), WorkloadStatus::Running);
    }

    #[test]
    fn test_deletion_marker() {
        let mut w = running_pod();
        w.statuses = vec![ContainerFacts::new("app").running(true)];
        w.deleting = true;
        assert_eq!(derive_status(&w), WorkloadStatus::Terminating);

        w.reason = Some("NodeLost".into());
        assert_eq!(derive_status(&w), WorkloadStatus::Unknown);
    }

    #[test]
    fn test_default_running() {
        let w = WorkloadRecord::new("bare", "default");
        assert_eq!(derive_status(&w), WorkloadStatus::Running);
    }

    #[test]
    fn test_severity_groups() {
        assert_eq!(WorkloadStatus::Succeeded.severity(), Severity::Active);
        assert_eq!(WorkloadStatus::Terminating.severity(), Severity::Pending);
        assert_eq!(WorkloadStatus::Unknown.severity(), Severity::Error);
    }
}
