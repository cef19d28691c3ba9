use logbook_core::model::{WorkloadEvent, WorkloadList};
use logbook_core::relay::LineBatch;

/// Which supervised stream an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Watch,
    Tail,
}

impl StreamKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Tail => "log stream",
        }
    }
}

/// Everything the background tasks tell the UI loop.
///
/// Each event carries the generation of the stream that produced it; the
/// controller drops events from streams it has already replaced.
#[derive(Debug)]
pub enum AppEvent {
    /// Initial listing of a (re)started watch.
    Listed { generation: u64, list: WorkloadList },
    /// The watch stream of a (re)started watch is open.
    Watching { generation: u64 },
    /// One change from the watch.
    Workload { generation: u64, event: WorkloadEvent },
    /// Lines flushed by the relay of a log tail.
    Lines { generation: u64, lines: LineBatch },
    /// A stream returned on its own; its result is collected with `stop()`.
    StreamEnded { kind: StreamKind, generation: u64 },
    /// Backoff elapsed for a failed stream.
    Retry { kind: StreamKind, generation: u64 },
}
