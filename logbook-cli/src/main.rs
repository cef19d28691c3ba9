mod app;
mod event;
mod keymap;
mod sources;
mod ui;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event as CEvent, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::{EnvFilter, prelude::*};

use logbook_core::config::LogbookConfig;
use logbook_core::source::ClusterSource;

use app::App;
use event::AppEvent;
use sources::{DemoSource, KubeSource};
use ui::Theme;

/// Redraw at least this often so status messages expire on time.
const TICK: Duration = Duration::from_millis(250);

/// logbook: view logs on multiple pods and containers from Kubernetes
#[derive(Parser, Debug)]
#[command(name = "logbook")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Namespace to watch (default: config file, then the kubeconfig context)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Path to the logbook config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Browse a simulated namespace instead of a cluster
    #[arg(long)]
    demo: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log file path
    #[arg(long, default_value = "/tmp/logbook.log")]
    log_file: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Logs go to a file; stdout belongs to the TUI
    init_logging(&cli)?;

    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let (config_path, config) = LogbookConfig::discover(cli.config.as_deref(), &cwd)
        .context("failed to load configuration")?;
    match &config_path {
        Some(path) => tracing::info!(path = %path.display(), "loaded config"),
        None => tracing::info!("no config file found, using defaults"),
    }

    let source: Arc<dyn ClusterSource> = if cli.demo {
        Arc::new(DemoSource::new())
    } else {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let kubeconfig = cli
            .kubeconfig
            .clone()
            .or_else(|| config.kubeconfig_path(home.as_deref()));
        Arc::new(KubeSource::connect(kubeconfig.as_deref()).await?)
    };

    let namespace = cli
        .namespace
        .clone()
        .or_else(|| config.namespace.clone())
        .unwrap_or_else(|| source.default_namespace().to_string());
    tracing::info!(context = source.context(), %namespace, "starting logbook");

    let theme = Theme::from_name(config.theme);
    let (app, rx) = App::new(source, namespace, &config);
    run_tui(app, rx, &theme).await
}

fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("failed to create log file {}", cli.log_file))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false)
                .with_target(false),
        )
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();
    Ok(())
}

// --- Terminal setup/teardown ---
fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_tui(
    mut app: App,
    mut rx: mpsc::UnboundedReceiver<AppEvent>,
    theme: &Theme,
) -> Result<()> {
    let mut terminal = setup_terminal().context("failed to set up terminal")?;
    app.start();

    let result = event_loop(&mut terminal, &mut app, &mut rx, theme).await;

    app.shutdown().await;
    restore_terminal(terminal).context("failed to restore terminal")?;
    tracing::info!("logbook exited");
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
    theme: &Theme,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    while app.is_running() {
        let size = terminal.size()?;
        let pager = ui::layout(Rect::new(0, 0, size.width, size.height)).pager;
        app.resize_pager(pager.width as usize, pager.height as usize);
        terminal.draw(|f| ui::render(f, app, theme))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(CEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key).await;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("failed to read terminal event"),
                None => break,
            },
            Some(event) = rx.recv() => app.handle_event(event).await,
            _ = ticker.tick() => {}
        }
    }
    Ok(())
}
