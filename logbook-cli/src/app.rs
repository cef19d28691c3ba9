//! Controller: owns the view models and the two supervised streams.
//!
//! All state lives here and is only touched from the UI loop. Background
//! tasks talk back through [`AppEvent`]s; each carries the generation of the
//! stream that sent it so events from a replaced stream are dropped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyEvent;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use logbook_core::config::{LogbookConfig, RetryConfig};
use logbook_core::error::StreamError;
use logbook_core::lifecycle::{WorkloadStatus, derive_status};
use logbook_core::model::{WorkloadEvent, WorkloadList, WorkloadRecord};
use logbook_core::relay::{self, RelayWriter};
use logbook_core::selection::SelectionList;
use logbook_core::source::ClusterSource;
use logbook_core::supervisor::TaskSupervisor;
use logbook_core::viewport::Viewport;

use crate::event::{AppEvent, StreamKind};
use crate::keymap::{self, Action, Mode};
use crate::ui::input_line::InputLine;

const MESSAGE_TTL: Duration = Duration::from_secs(5);

/// The container whose log is being followed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TailTarget {
    pub workload: String,
    pub container: String,
}

/// Doubling reconnect delay.
#[derive(Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl Backoff {
    fn new(config: &RetryConfig) -> Self {
        let initial = Duration::from_millis(config.initial_ms);
        Self {
            initial,
            max: Duration::from_millis(config.max_ms),
            next: initial,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.next = self.initial;
    }
}

struct StatusMessage {
    text: String,
    expires: Instant,
}

pub struct App {
    source: Arc<dyn ClusterSource>,
    namespace: String,
    flush_interval: Duration,
    max_batch: usize,
    tx: mpsc::UnboundedSender<AppEvent>,
    shutdown: CancellationToken,

    watch: TaskSupervisor,
    watch_generation: u64,
    watch_backoff: Backoff,

    tail: TaskSupervisor,
    tail_generation: u64,
    tail_backoff: Backoff,
    tail_target: Option<TailTarget>,

    records: HashMap<String, WorkloadRecord>,
    workloads: SelectionList<WorkloadStatus>,
    containers: SelectionList<()>,
    auto_selected: bool,

    viewport: Viewport,
    searching: bool,
    input: InputLine,
    message: Option<StatusMessage>,
    running: bool,
}

impl App {
    pub fn new(
        source: Arc<dyn ClusterSource>,
        namespace: String,
        config: &LogbookConfig,
    ) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let app = Self {
            source,
            namespace,
            flush_interval: config.flush_interval(),
            max_batch: config.max_batch,
            tx,
            watch: TaskSupervisor::new("watch", shutdown.clone()),
            watch_generation: 0,
            watch_backoff: Backoff::new(&config.retry),
            tail: TaskSupervisor::new("tail", shutdown.clone()),
            tail_generation: 0,
            tail_backoff: Backoff::new(&config.retry),
            tail_target: None,
            shutdown,
            records: HashMap::new(),
            workloads: SelectionList::new(),
            containers: SelectionList::new(),
            auto_selected: false,
            viewport: Viewport::new().with_max_lines(config.max_lines),
            searching: false,
            input: InputLine::new(),
            message: None,
            running: true,
        };
        (app, rx)
    }

    /// Begin watching workloads.
    pub fn start(&mut self) {
        self.start_watch();
    }

    /// Stop both streams and wait for them.
    pub async fn shutdown(&mut self) {
        for supervisor in [&mut self.tail, &mut self.watch] {
            if let Err(e) = supervisor.stop().await {
                debug!(supervisor = supervisor.name(), error = %e, "stream ended with an error");
            }
        }
        self.shutdown.cancel();
    }

    // ========== Accessors for rendering ==========

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> Mode {
        if self.searching {
            Mode::SearchInput
        } else if self.viewport.is_following() {
            Mode::Follow
        } else {
            Mode::Normal
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn context(&self) -> &str {
        self.source.context()
    }

    pub fn workloads(&self) -> &SelectionList<WorkloadStatus> {
        &self.workloads
    }

    pub fn containers(&self) -> &SelectionList<()> {
        &self.containers
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn input(&self) -> &InputLine {
        &self.input
    }

    pub fn tail_target(&self) -> Option<&TailTarget> {
        self.tail_target.as_ref()
    }

    /// Transient status-bar message, until it expires.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_ref()
            .filter(|m| m.expires > Instant::now())
            .map(|m| m.text.as_str())
    }

    fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some(StatusMessage {
            text: text.into(),
            expires: Instant::now() + MESSAGE_TTL,
        });
    }

    pub fn resize_pager(&mut self, width: usize, height: usize) {
        self.viewport.resize(width, height);
    }

    // ========== Input ==========

    pub async fn handle_key(&mut self, key: KeyEvent) {
        if let Some(action) = keymap::route(self.mode(), &key) {
            trace!(?action, "key action");
            self.apply(action).await;
        }
    }

    pub async fn apply(&mut self, action: Action) {
        match action {
            Action::ScrollUp => {
                self.viewport.scroll_up(1);
            }
            Action::ScrollDown => {
                self.viewport.scroll_down(1);
            }
            Action::HalfPageUp => {
                self.viewport.scroll_half_page_up();
            }
            Action::HalfPageDown => {
                self.viewport.scroll_half_page_down();
            }
            Action::PageUp => {
                self.viewport.scroll_page_up();
            }
            Action::PageDown => {
                self.viewport.scroll_page_down();
            }
            Action::ScrollTop => {
                self.viewport.scroll_to_top();
            }
            Action::ScrollBottom => {
                self.viewport.scroll_to_bottom();
            }
            Action::HalfPageLeft => {
                self.viewport.scroll_half_page_left();
            }
            Action::HalfPageRight => {
                self.viewport.scroll_half_page_right();
            }

            Action::NextWorkload => {
                self.workloads.select_next();
                self.drain_selection().await;
            }
            Action::PrevWorkload => {
                self.workloads.select_prev();
                self.drain_selection().await;
            }
            Action::NextContainer => {
                self.containers.select_next();
                self.drain_selection().await;
            }
            Action::PrevContainer => {
                self.containers.select_prev();
                self.drain_selection().await;
            }

            Action::ToggleFollow => {
                self.viewport.toggle_follow();
            }
            Action::StartSearch => {
                self.searching = true;
                self.input.clear();
            }
            Action::NextMatch => {
                if !self.viewport.find_next() {
                    self.report_no_match();
                }
            }
            Action::PrevMatch => {
                if !self.viewport.find_prev() {
                    self.report_no_match();
                }
            }

            Action::Edit(edit) => self.input.apply(edit),
            Action::SubmitSearch => {
                self.searching = false;
                let keyword = self.input.text();
                self.viewport.set_keyword(&keyword);
                if !keyword.is_empty() && !self.viewport.find_next() {
                    self.report_no_match();
                }
            }
            Action::CancelSearch => {
                self.searching = false;
                self.input.clear();
            }

            Action::Quit => self.running = false,
        }
    }

    fn report_no_match(&mut self) {
        if self.viewport.keyword().is_empty() {
            return;
        }
        let text = format!("pattern not found: {}", self.viewport.keyword());
        self.set_message(text);
    }

    // ========== Stream events ==========

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Listed { generation, list } if generation == self.watch_generation => {
                self.reconcile(list).await;
            }
            AppEvent::Watching { generation } if generation == self.watch_generation => {
                self.watch_backoff.reset();
            }
            AppEvent::Workload { generation, event } if generation == self.watch_generation => {
                self.apply_workload_event(event).await;
            }
            AppEvent::Lines { generation, lines } if generation == self.tail_generation => {
                self.tail_backoff.reset();
                self.viewport.append_lines(lines);
            }
            AppEvent::StreamEnded { kind, generation } => {
                self.on_stream_ended(kind, generation).await;
            }
            AppEvent::Retry { kind, generation } => self.on_retry(kind, generation).await,
            _ => trace!("dropping event from a replaced stream"),
        }
    }

    /// Bring the list in line with a fresh listing.
    async fn reconcile(&mut self, list: WorkloadList) {
        let present: HashSet<&str> = list.items.iter().map(|r| r.name.as_str()).collect();
        let vanished: Vec<String> = self
            .workloads
            .items()
            .iter()
            .filter(|item| !present.contains(item.name.as_str()))
            .map(|item| item.name.clone())
            .collect();
        debug!(
            listed = list.items.len(),
            vanished = vanished.len(),
            "reconciling workloads"
        );

        for name in vanished {
            self.remove_workload(&name);
        }
        for record in list.items {
            self.upsert_workload(record);
        }
        self.after_list_change().await;
    }

    async fn apply_workload_event(&mut self, event: WorkloadEvent) {
        match event {
            WorkloadEvent::Added(record) | WorkloadEvent::Modified(record) => {
                self.upsert_workload(record);
            }
            WorkloadEvent::Deleted(record) => self.remove_workload(&record.name),
        }
        self.after_list_change().await;
    }

    /// Add or update a workload. A second *Added* for a known name is an
    /// update.
    fn upsert_workload(&mut self, record: WorkloadRecord) {
        let status = derive_status(&record);
        let name = record.name.clone();

        let result = if self.workloads.contains(&name) {
            self.workloads.set_style(&name, status)
        } else {
            self.workloads.add_item(name.clone(), status)
        };
        if let Err(e) = result {
            error!(error = %e, "workload list out of sync");
        }

        let containers_changed = self
            .records
            .get(&name)
            .is_none_or(|old| !old.container_names().eq(record.container_names()));
        self.records.insert(name.clone(), record);

        if containers_changed && self.workloads.selected_name() == Some(name.as_str()) {
            let keep = self.containers.selected_name().map(str::to_string);
            self.load_containers(keep.as_deref());
        }
    }

    fn remove_workload(&mut self, name: &str) {
        let was_selected = self.workloads.selected_name() == Some(name);
        if let Err(e) = self.workloads.delete_item(name) {
            error!(error = %e, "workload list out of sync");
        }
        self.records.remove(name);
        if was_selected {
            self.containers.clear();
        }
    }

    async fn after_list_change(&mut self) {
        if !self.auto_selected && !self.workloads.is_empty() {
            self.auto_selected = true;
            if self.workloads.selected().is_none() {
                self.workloads.select_at(0);
            }
        }
        self.drain_selection().await;
    }

    /// Rebuild the container tabs of the selected workload and select `keep`
    /// when it still exists, else the first container.
    fn load_containers(&mut self, keep: Option<&str>) {
        self.containers.clear();
        let Some(record) = self
            .workloads
            .selected_name()
            .and_then(|name| self.records.get(name))
        else {
            return;
        };

        for name in record.container_names() {
            if let Err(e) = self.containers.add_item(name, ()) {
                error!(error = %e, "duplicate container name");
            }
        }
        let index = keep
            .and_then(|keep| record.container_names().position(|name| name == keep))
            .unwrap_or(0);
        self.containers.select_at(index);
    }

    /// React to queued selection changes.
    async fn drain_selection(&mut self) {
        let workload_changed = !self.workloads.take_events().is_empty();
        if workload_changed {
            self.load_containers(None);
        }
        self.containers.take_events();
        self.sync_tail().await;
    }

    fn selected_target(&self) -> Option<TailTarget> {
        Some(TailTarget {
            workload: self.workloads.selected_name()?.to_string(),
            container: self.containers.selected_name()?.to_string(),
        })
    }

    /// Restart the tail when the selection points somewhere new.
    async fn sync_tail(&mut self) {
        let target = self.selected_target();
        if target == self.tail_target {
            return;
        }
        self.viewport.set_follow(false);
        self.restart_tail(target).await;
    }

    /// Stop the current tail, clear the pager and follow `target`.
    async fn restart_tail(&mut self, target: Option<TailTarget>) {
        if let Err(e) = self.tail.stop().await {
            warn!(error = %e, "previous log stream ended with an error");
        }
        self.viewport.clear();
        self.tail_generation += 1;
        self.tail_target = target.clone();

        let Some(target) = target else {
            debug!("nothing selected, log stream idle");
            return;
        };
        info!(
            workload = %target.workload,
            container = %target.container,
            generation = self.tail_generation,
            "following logs"
        );

        let job = TailJob {
            source: self.source.clone(),
            namespace: self.namespace.clone(),
            target,
            tx: self.tx.clone(),
            generation: self.tail_generation,
            flush_interval: self.flush_interval,
            max_batch: self.max_batch,
        };
        if let Err(e) = self.tail.start(move |token| job.run(token)) {
            error!(error = %e, "log stream not started");
        }
    }

    fn start_watch(&mut self) {
        self.watch_generation += 1;
        let job = WatchJob {
            source: self.source.clone(),
            namespace: self.namespace.clone(),
            tx: self.tx.clone(),
            generation: self.watch_generation,
        };
        info!(namespace = %self.namespace, generation = self.watch_generation, "watching workloads");
        if let Err(e) = self.watch.start(move |token| job.run(token)) {
            error!(error = %e, "workload watch not started");
        }
    }

    async fn on_stream_ended(&mut self, kind: StreamKind, generation: u64) {
        match kind {
            StreamKind::Watch => {
                if generation != self.watch_generation {
                    return;
                }
                let result = self.watch.stop().await;
                let delay = self.watch_backoff.next_delay();
                match &result {
                    Ok(()) => info!(?delay, "workload watch ended"),
                    Err(e) => warn!(error = %e, ?delay, "workload watch failed"),
                }
                self.report_retry(kind, result.err(), delay);
                self.schedule_retry(kind, generation, delay);
            }
            StreamKind::Tail => {
                if generation != self.tail_generation {
                    return;
                }
                match self.tail.stop().await {
                    Ok(()) => {
                        info!("log stream closed by remote");
                        self.set_message("stream closed");
                    }
                    Err(e) => {
                        let delay = self.tail_backoff.next_delay();
                        warn!(error = %e, ?delay, "log stream failed");
                        self.report_retry(kind, Some(e), delay);
                        self.schedule_retry(kind, generation, delay);
                    }
                }
            }
        }
    }

    fn report_retry(&mut self, kind: StreamKind, error: Option<StreamError>, delay: Duration) {
        let what = match error {
            Some(e) => format!("{} failed: {}", kind.label(), e),
            None => format!("{} ended", kind.label()),
        };
        self.set_message(format!(
            "{}; retrying in {:.1}s",
            what,
            delay.as_secs_f64()
        ));
    }

    fn schedule_retry(&self, kind: StreamKind, generation: u64, delay: Duration) {
        let tx = self.tx.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(AppEvent::Retry { kind, generation });
                }
            }
        });
    }

    async fn on_retry(&mut self, kind: StreamKind, generation: u64) {
        match kind {
            StreamKind::Watch => {
                if generation != self.watch_generation || self.watch.is_running() {
                    return;
                }
                self.start_watch();
            }
            StreamKind::Tail => {
                if generation != self.tail_generation || self.tail.is_running() {
                    return;
                }
                let target = self.selected_target();
                if target.is_none() || target != self.tail_target {
                    return;
                }
                self.restart_tail(target).await;
            }
        }
    }
}

/// Lists, then watches, the workloads of one namespace.
struct WatchJob {
    source: Arc<dyn ClusterSource>,
    namespace: String,
    tx: mpsc::UnboundedSender<AppEvent>,
    generation: u64,
}

impl WatchJob {
    async fn run(self, token: CancellationToken) -> Result<(), StreamError> {
        let result = tokio::select! {
            _ = token.cancelled() => Err(StreamError::Cancelled),
            result = self.follow() => result,
        };
        if !matches!(result, Err(StreamError::Cancelled)) {
            let _ = self.tx.send(AppEvent::StreamEnded {
                kind: StreamKind::Watch,
                generation: self.generation,
            });
        }
        result
    }

    async fn follow(&self) -> Result<(), StreamError> {
        let list = self.source.list_workloads(&self.namespace).await?;
        let resource_version = list.resource_version.clone();
        self.send(AppEvent::Listed {
            generation: self.generation,
            list,
        })?;

        let mut events = self
            .source
            .watch_workloads(&self.namespace, resource_version)
            .await?;
        self.send(AppEvent::Watching {
            generation: self.generation,
        })?;
        while let Some(event) = events.next().await {
            self.send(AppEvent::Workload {
                generation: self.generation,
                event: event?,
            })?;
        }
        Ok(())
    }

    fn send(&self, event: AppEvent) -> Result<(), StreamError> {
        self.tx.send(event).map_err(|_| StreamError::Closed)
    }
}

/// Follows one container's log through a relay.
struct TailJob {
    source: Arc<dyn ClusterSource>,
    namespace: String,
    target: TailTarget,
    tx: mpsc::UnboundedSender<AppEvent>,
    generation: u64,
    flush_interval: Duration,
    max_batch: usize,
}

impl TailJob {
    async fn run(self, token: CancellationToken) -> Result<(), StreamError> {
        let (writer, mut batches) = relay::channel(self.flush_interval, self.max_batch);
        let generation = self.generation;
        let forward_tx = self.tx.clone();
        let forward = tokio::spawn(async move {
            while let Some(lines) = batches.next().await {
                if forward_tx.send(AppEvent::Lines { generation, lines }).is_err() {
                    break;
                }
            }
        });

        let result = tokio::select! {
            _ = token.cancelled() => Err(StreamError::Cancelled),
            result = self.pump(&writer) => result,
        };
        writer.close();
        let _ = forward.await;

        if !matches!(result, Err(StreamError::Cancelled)) {
            let _ = self.tx.send(AppEvent::StreamEnded {
                kind: StreamKind::Tail,
                generation,
            });
        }
        result
    }

    async fn pump(&self, writer: &RelayWriter) -> Result<(), StreamError> {
        let mut lines = self
            .source
            .stream_logs(&self.namespace, &self.target.workload, &self.target.container)
            .await?;
        while let Some(line) = lines.next().await {
            writer.write(line?).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures_util::stream;
    use logbook_core::model::{ContainerFacts, WorkloadPhase};
    use logbook_core::source::{LogStream, WorkloadStream};

    use super::*;

    /// In-memory cluster. Listed logs are followed by silence, unless the
    /// container is marked finite, in which case the stream ends.
    #[derive(Default)]
    struct ScriptedSource {
        workloads: Vec<WorkloadRecord>,
        logs: HashMap<(String, String), Vec<String>>,
        finite: HashSet<String>,
        tail_failures: AtomicUsize,
        watch_failures: AtomicUsize,
        lists: AtomicUsize,
    }

    impl ScriptedSource {
        fn with_pod(mut self, name: &str, containers: &[&str]) -> Self {
            let mut pod = WorkloadRecord::new(name, "default");
            pod.phase = Some(WorkloadPhase::Running);
            pod.containers = containers.iter().map(|c| c.to_string()).collect();
            pod.statuses = containers
                .iter()
                .map(|c| ContainerFacts::new(*c).running(true))
                .collect();
            self.workloads.push(pod);
            self
        }

        fn with_logs(mut self, pod: &str, container: &str, lines: &[&str]) -> Self {
            self.logs.insert(
                (pod.to_string(), container.to_string()),
                lines.iter().map(|l| l.to_string()).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl ClusterSource for ScriptedSource {
        fn context(&self) -> &str {
            "test"
        }

        fn default_namespace(&self) -> &str {
            "default"
        }

        async fn list_workloads(&self, _namespace: &str) -> Result<WorkloadList, StreamError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(WorkloadList {
                items: self.workloads.clone(),
                resource_version: Some("1".into()),
            })
        }

        async fn watch_workloads(
            &self,
            _namespace: &str,
            _resource_version: Option<String>,
        ) -> Result<WorkloadStream, StreamError> {
            if take_failure(&self.watch_failures) {
                return Err(StreamError::transport("watch refused"));
            }
            Ok(stream::pending().boxed())
        }

        async fn stream_logs(
            &self,
            _namespace: &str,
            workload: &str,
            container: &str,
        ) -> Result<LogStream, StreamError> {
            if take_failure(&self.tail_failures) {
                return Err(StreamError::transport("connection reset"));
            }
            let lines: Vec<Result<String, StreamError>> = self
                .logs
                .get(&(workload.to_string(), container.to_string()))
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(Ok)
                .collect();
            if self.finite.contains(container) {
                Ok(stream::iter(lines).boxed())
            } else {
                Ok(stream::iter(lines).chain(stream::pending()).boxed())
            }
        }
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn shop() -> ScriptedSource {
        ScriptedSource::default()
            .with_pod("api", &["app", "proxy"])
            .with_pod("db", &["postgres"])
            .with_logs("api", "app", &["GET /health 200", "GET /users 500 error"])
            .with_logs("api", "proxy", &["proxy up"])
            .with_logs("db", "postgres", &["ready to accept connections"])
    }

    fn new_app(source: ScriptedSource) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (mut app, rx) = App::new(Arc::new(source), "default".into(), &LogbookConfig::default());
        app.resize_pager(80, 10);
        (app, rx)
    }

    async fn pump_until(
        app: &mut App,
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
        done: impl Fn(&App) -> bool,
    ) {
        while !done(app) {
            let event = tokio::time::timeout(Duration::from_secs(120), rx.recv())
                .await
                .expect("condition not reached before timeout")
                .expect("event channel closed");
            app.handle_event(event).await;
        }
    }

    fn lines(app: &App) -> Vec<String> {
        app.viewport().lines().map(str::to_string).collect()
    }

    fn names<S>(list: &SelectionList<S>) -> Vec<&str> {
        list.items().iter().map(|item| item.name.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_workload_is_selected_and_followed() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.viewport().line_count() == 2).await;

        assert_eq!(app.workloads().selected_name(), Some("api"));
        assert_eq!(names(app.containers()), vec!["app", "proxy"]);
        assert_eq!(
            app.tail_target(),
            Some(&TailTarget {
                workload: "api".into(),
                container: "app".into()
            })
        );
        assert_eq!(lines(&app), vec!["GET /health 200", "GET /users 500 error"]);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_container_drops_stale_lines() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.viewport().line_count() == 2).await;
        let old_generation = app.tail_generation;

        app.apply(Action::NextContainer).await;
        assert!(app.viewport().is_empty());
        assert_eq!(app.tail_target().unwrap().container, "proxy");

        app.handle_event(AppEvent::Lines {
            generation: old_generation,
            lines: vec!["stale".into()],
        })
        .await;
        assert!(app.viewport().is_empty());

        pump_until(&mut app, &mut rx, |app| !app.viewport().is_empty()).await;
        assert_eq!(lines(&app), vec!["proxy up"]);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_selecting_workload_leaves_follow_mode() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.tail_target().is_some()).await;

        app.apply(Action::ToggleFollow).await;
        assert_eq!(app.mode(), Mode::Follow);

        app.apply(Action::NextWorkload).await;
        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.workloads().selected_name(), Some("db"));
        assert_eq!(names(app.containers()), vec!["postgres"]);

        pump_until(&mut app, &mut rx, |app| !app.viewport().is_empty()).await;
        assert_eq!(lines(&app), vec!["ready to accept connections"]);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_added_is_an_update() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.workloads().len() == 2).await;

        let mut failed = WorkloadRecord::new("db", "default");
        failed.phase = Some(WorkloadPhase::Failed);
        failed.containers = vec!["postgres".into()];
        app.handle_event(AppEvent::Workload {
            generation: app.watch_generation,
            event: WorkloadEvent::Added(failed),
        })
        .await;

        assert_eq!(names(app.workloads()), vec!["api", "db"]);
        assert_eq!(app.workloads().items()[1].style, WorkloadStatus::Failed);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_selected_workload_stops_tail() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.viewport().line_count() == 2).await;

        app.handle_event(AppEvent::Workload {
            generation: app.watch_generation,
            event: WorkloadEvent::Deleted(WorkloadRecord::new("api", "default")),
        })
        .await;

        assert_eq!(names(app.workloads()), vec!["db"]);
        assert_eq!(app.workloads().selected(), None);
        assert!(app.containers().is_empty());
        assert!(app.viewport().is_empty());
        assert_eq!(app.tail_target(), None);
        assert!(!app.tail.is_running());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_relisting_removes_vanished_workloads() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.workloads().len() == 2).await;

        let mut list = WorkloadList::default();
        list.items.push(WorkloadRecord::new("db", "default"));
        list.items.push(WorkloadRecord::new("cache", "default"));
        app.handle_event(AppEvent::Listed {
            generation: app.watch_generation,
            list,
        })
        .await;

        assert_eq!(names(app.workloads()), vec!["db", "cache"]);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_from_replaced_watch_are_ignored() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.workloads().len() == 2).await;

        app.handle_event(AppEvent::Workload {
            generation: app.watch_generation - 1,
            event: WorkloadEvent::Added(WorkloadRecord::new("ghost", "default")),
        })
        .await;
        assert_eq!(app.workloads().len(), 2);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tail_is_retried() {
        let source = shop();
        source.tail_failures.store(1, Ordering::SeqCst);
        let (mut app, mut rx) = new_app(source);
        app.start();

        pump_until(&mut app, &mut rx, |app| {
            app.message().is_some_and(|m| m.contains("retrying"))
        })
        .await;
        assert!(app.viewport().is_empty());

        pump_until(&mut app, &mut rx, |app| app.viewport().line_count() == 2).await;
        assert_eq!(app.tail_backoff.next, app.tail_backoff.initial);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_tail_is_not_retried() {
        let mut source = ScriptedSource::default()
            .with_pod("job", &["report"])
            .with_logs("job", "report", &["row 1", "row 2", "done"]);
        source.finite.insert("report".into());
        let (mut app, mut rx) = new_app(source);
        app.start();

        pump_until(&mut app, &mut rx, |app| app.message() == Some("stream closed")).await;
        assert_eq!(lines(&app), vec!["row 1", "row 2", "done"]);
        assert!(!app.tail.is_running());
        assert!(app.tail_target().is_some());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_watch_relists() {
        let source = shop();
        source.watch_failures.store(1, Ordering::SeqCst);
        let (mut app, mut rx) = new_app(source);
        app.start();

        pump_until(&mut app, &mut rx, |app| app.watch_generation == 2 && app.watch.is_running())
            .await;
        pump_until(&mut app, &mut rx, |app| app.watch_backoff.next == app.watch_backoff.initial)
            .await;
        assert_eq!(names(app.workloads()), vec!["api", "db"]);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_backoff_grows_while_watch_keeps_failing() {
        let source = shop();
        source.watch_failures.store(4, Ordering::SeqCst);
        let (mut app, mut rx) = new_app(source);
        app.start();

        let mut delays = Vec::new();
        while delays.len() < 4 {
            let event = tokio::time::timeout(Duration::from_secs(120), rx.recv())
                .await
                .expect("watch did not fail again before timeout")
                .expect("event channel closed");
            let watch_ended = matches!(
                event,
                AppEvent::StreamEnded {
                    kind: StreamKind::Watch,
                    ..
                }
            );
            app.handle_event(event).await;
            if watch_ended {
                let message = app.message().unwrap_or_default();
                let delay = message.rsplit("retrying in ").next().unwrap_or_default();
                delays.push(delay.to_string());
            }
        }
        assert_eq!(delays, vec!["0.5s", "1.0s", "2.0s", "4.0s"]);

        pump_until(&mut app, &mut rx, |app| {
            app.watch.is_running() && app.watch_backoff.next == app.watch_backoff.initial
        })
        .await;
        assert_eq!(app.watch_generation, 5);
        app.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_from_prompt() {
        let (mut app, mut rx) = new_app(shop());
        app.start();
        pump_until(&mut app, &mut rx, |app| app.viewport().line_count() == 2).await;

        app.apply(Action::StartSearch).await;
        assert_eq!(app.mode(), Mode::SearchInput);
        for c in "error".chars() {
            app.apply(Action::Edit(crate::keymap::InputEdit::Insert(c))).await;
        }
        app.apply(Action::SubmitSearch).await;

        assert_eq!(app.mode(), Mode::Normal);
        assert_eq!(app.viewport().keyword(), "error");
        assert_eq!(app.viewport().active_match(), Some(0));

        app.apply(Action::StartSearch).await;
        app.apply(Action::Edit(crate::keymap::InputEdit::Insert('z'))).await;
        app.apply(Action::CancelSearch).await;
        assert_eq!(app.viewport().keyword(), "error");

        app.apply(Action::StartSearch).await;
        app.apply(Action::Edit(crate::keymap::InputEdit::Insert('z'))).await;
        app.apply(Action::SubmitSearch).await;
        assert_eq!(app.message(), Some("pattern not found: z"));
        app.shutdown().await;
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let mut backoff = Backoff::new(&RetryConfig {
            initial_ms: 500,
            max_ms: 3000,
        });
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }
}
