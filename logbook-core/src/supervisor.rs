//! Runs one cancelable background operation at a time.
//!
//! Both long-lived streams (the workload watch and the log tail) run under
//! their own supervisor. Restarting a stream is always `stop().await` followed
//! by `start(..)`; the supervisor refuses a second `start` while a task is
//! still active instead of silently replacing it.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{StreamError, SupervisorError};

struct ActiveTask {
    token: CancellationToken,
    handle: JoinHandle<Result<(), StreamError>>,
}

pub struct TaskSupervisor {
    name: &'static str,
    parent: CancellationToken,
    active: Option<ActiveTask>,
}

impl TaskSupervisor {
    /// Create a supervisor whose tasks are cancelled together with `parent`.
    pub fn new(name: &'static str, parent: CancellationToken) -> Self {
        Self {
            name,
            parent,
            active: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Launch `op` under a fresh child token of the parent.
    pub fn start<F, Fut>(&mut self, op: F) -> Result<(), SupervisorError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), StreamError>> + Send + 'static,
    {
        if self.active.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }

        let token = self.parent.child_token();
        let handle = tokio::spawn(op(token.clone()));
        debug!(supervisor = self.name, "task started");
        self.active = Some(ActiveTask { token, handle });
        Ok(())
    }

    /// Cancel the active task, wait until it has returned and hand back its
    /// terminal error. Cancellation is reported as success.
    pub async fn stop(&mut self) -> Result<(), StreamError> {
        let Some(task) = self.active.take() else {
            return Ok(());
        };

        task.token.cancel();
        let result = match task.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(StreamError::Aborted {
                message: "operation panicked".into(),
            }),
            Err(e) => Err(StreamError::Aborted {
                message: e.to_string(),
            }),
        };
        debug!(supervisor = self.name, ?result, "task stopped");

        match result {
            Err(e) if e.is_cancellation() => Ok(()),
            other => other,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// True when a task was started and has already returned on its own.
    pub fn is_finished(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|task| task.handle.is_finished())
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        if let Some(task) = &self.active {
            task.token.cancel();
        }
    }
}
