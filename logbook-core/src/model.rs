//! Workload records as seen by the viewer.
//!
//! These are deliberately flatter than the cluster's own objects: only the
//! facts the lifecycle state machine and the UI need are kept.

pub type WorkloadName = String;

/// Top-level phase reported by the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkloadPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl WorkloadPhase {
    pub fn parse(phase: &str) -> Option<Self> {
        match phase {
            "Pending" => Some(Self::Pending),
            "Running" => Some(Self::Running),
            "Succeeded" => Some(Self::Succeeded),
            "Failed" => Some(Self::Failed),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaitingFacts {
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerminatedFacts {
    pub exit_code: i32,
    pub reason: String,
}

/// Raw runtime state of one container. More than one of the flags may be
/// set while the cluster is transitioning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerFacts {
    pub name: String,
    pub ready: bool,
    pub waiting: Option<WaitingFacts>,
    pub running: bool,
    pub terminated: Option<TerminatedFacts>,
}

impl ContainerFacts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn waiting(mut self, reason: impl Into<String>) -> Self {
        self.waiting = Some(WaitingFacts {
            reason: reason.into(),
        });
        self
    }

    pub fn running(mut self, ready: bool) -> Self {
        self.running = true;
        self.ready = ready;
        self
    }

    pub fn terminated(mut self, exit_code: i32, reason: impl Into<String>) -> Self {
        self.terminated = Some(TerminatedFacts {
            exit_code,
            reason: reason.into(),
        });
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadRecord {
    pub name: WorkloadName,
    pub namespace: String,
    pub phase: Option<WorkloadPhase>,
    /// Top-level status reason, e.g. `NodeLost`.
    pub reason: Option<String>,
    /// Deletion has been requested.
    pub deleting: bool,
    /// Declared init containers, in order.
    pub init_containers: Vec<String>,
    /// Declared regular containers, in order.
    pub containers: Vec<String>,
    pub init_statuses: Vec<ContainerFacts>,
    pub statuses: Vec<ContainerFacts>,
}

impl WorkloadRecord {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Container names as shown in the tabs: init containers first.
    pub fn container_names(&self) -> impl Iterator<Item = &str> {
        self.init_containers
            .iter()
            .chain(self.containers.iter())
            .map(String::as_str)
    }
}

/// A change observed on the workload watch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkloadEvent {
    Added(WorkloadRecord),
    Modified(WorkloadRecord),
    Deleted(WorkloadRecord),
}

impl WorkloadEvent {
    pub fn record(&self) -> &WorkloadRecord {
        match self {
            Self::Added(r) | Self::Modified(r) | Self::Deleted(r) => r,
        }
    }
}

/// Snapshot returned by the initial listing.
#[derive(Clone, Debug, Default)]
pub struct WorkloadList {
    pub items: Vec<WorkloadRecord>,
    /// Position to resume the watch from, when the source has one.
    pub resource_version: Option<String>,
}
