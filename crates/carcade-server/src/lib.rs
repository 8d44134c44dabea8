//! Development server for Carcade.
//!
//! Rebuilds the site atomically, serves the published directory, and starts
//! over whenever the project changes:
//!
//! ```text
//! watcher ──change (1 slot)──► serve cycle ──stop──► rebuild ──► serve cycle
//! ```
//!
//! The listening socket is bound once and reused by every serve cycle, so
//! rebuilding and serving never overlap.

mod app;
mod error;
mod watcher;

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use carcade_build::{BuildError, BuildReport, SiteBuilder};
use tokio::sync::{Mutex, mpsc, oneshot};

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Project directory watched for changes.
    pub project_dir: PathBuf,
    /// Published output path (a symlink to the current build).
    pub output_dir: PathBuf,
}

/// Why a serve cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Changed,
    Shutdown,
}

type Changes = Arc<Mutex<mpsc::Receiver<()>>>;

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound, the watcher cannot be
/// started, or the first build fails with no previous output to fall back on.
pub async fn run_server(config: ServerConfig, builder: SiteBuilder) -> Result<(), ServerError> {
    let builder = Arc::new(builder);
    let project_dir = std::fs::canonicalize(&config.project_dir)?;
    let output_dir = absolute_output(&config.output_dir)?;

    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    listener.set_nonblocking(true)?;
    let address = listener.local_addr()?;

    let (tx, rx) = mpsc::channel(1);
    let _watcher = watcher::watch(&project_dir, &output_dir, tx)?;
    let changes: Changes = Arc::new(Mutex::new(rx));

    if let Err(e) = rebuild(&builder, &output_dir).await? {
        if !output_dir.exists() {
            return Err(ServerError::InitialBuild(e));
        }
        tracing::error!(error = %e, "Build failed, serving previous output");
    }

    loop {
        let cycle_listener = tokio::net::TcpListener::from_std(listener.try_clone()?)?;
        let router = app::create_router(&output_dir);
        let (stop_tx, stop_rx) = oneshot::channel();

        tracing::info!(address = %address, "Serving site");
        axum::serve(cycle_listener, router)
            .with_graceful_shutdown(stop_signal(Arc::clone(&changes), stop_tx))
            .await?;

        match stop_rx.await.unwrap_or(Stop::Shutdown) {
            Stop::Shutdown => return Ok(()),
            Stop::Changed => {
                tracing::info!("Change detected, rebuilding");
                if let Err(e) = rebuild(&builder, &output_dir).await? {
                    tracing::error!(error = %e, "Build failed, serving previous output");
                }
                drain(&changes).await;
            }
        }
    }
}

/// Resolve once for a change signal or Ctrl-C, reporting which one fired.
async fn stop_signal(changes: Changes, stop: oneshot::Sender<Stop>) {
    let reason = tokio::select! {
        received = async { changes.lock().await.recv().await } => {
            if received.is_some() { Stop::Changed } else { Stop::Shutdown }
        }
        () = shutdown_signal() => Stop::Shutdown,
    };
    let _ = stop.send(reason);
}

/// Wait for Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Build on the blocking pool. The outer error is a task failure.
async fn rebuild(
    builder: &Arc<SiteBuilder>,
    output_dir: &Path,
) -> Result<Result<BuildReport, BuildError>, ServerError> {
    let builder = Arc::clone(builder);
    let output_dir = output_dir.to_path_buf();
    let result = tokio::task::spawn_blocking(move || builder.build_atomically(&output_dir)).await?;
    if let Ok(report) = &result {
        tracing::info!(written = report.written, "Site rebuilt");
    }
    Ok(result)
}

/// Drop signals raised while the rebuild was running.
async fn drain(changes: &Changes) {
    let mut rx = changes.lock().await;
    while rx.try_recv().is_ok() {}
}

/// Absolute form of `output`, which may not exist yet.
fn absolute_output(output: &Path) -> std::io::Result<PathBuf> {
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let parent = std::fs::canonicalize(parent)?;
    Ok(match output.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    })
}
