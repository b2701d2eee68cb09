//! Start command - launches the Lumy server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use futures::StreamExt;
use lumy_config::BackendKind;
use lumy_pipeline::{
    Backend, EngineBackend, InMemoryDataRegistry, LocalEngine, MockBackend, WorkflowSource,
};
use lumy_server::{AppState, Server, ServerConfig};
use lumy_types::Metadata;
use lumy_types::messages::LoadProgressStatus;

use super::Context;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Backend implementation: local or mock (overrides config)
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Workflow file to load at start-up (overrides config)
    #[arg(short, long)]
    pub workflow: Option<PathBuf>,

    /// Do not process automatically after input updates
    #[arg(long)]
    pub no_auto_process: bool,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    // ── Server settings ─────────────────────────────────────────────────

    let server_cfg = config.server();
    let port = args.port.unwrap_or(server_cfg.port);
    let bind = args.bind.clone().unwrap_or(server_cfg.bind.clone());
    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;

    let logging = config.logging();
    let server_config = ServerConfig::new()
        .with_bind_address(addr)
        .with_request_logging(server_cfg.request_logging)
        .with_max_log_len(logging.max_message_len);

    // ── Backend ─────────────────────────────────────────────────────────

    let backend_cfg = config.backend();
    let kind = args.backend.unwrap_or(backend_cfg.kind);
    let auto_process = backend_cfg.auto_process && !args.no_auto_process;
    let backend = build_backend(kind, auto_process);

    let catalog = ctx.catalog();

    if ctx.verbose {
        println!("Bind address: {}", addr);
        println!("Backend: {}", backend.name());
        for dir in catalog.dirs() {
            println!("Workflow dir: {}", dir.display());
        }
    }

    // ── Start-up workflow ───────────────────────────────────────────────

    if let Some(path) = args.workflow.or_else(|| config.workflows().default) {
        load_startup_workflow(backend.as_ref(), path).await;
    }

    // ── Serve ───────────────────────────────────────────────────────────

    let state = AppState::new(backend, catalog, server_config)?;
    println!("Lumy listening on ws://{}/ws/{{target}}", addr);
    Server::new(state).run().await?;
    Ok(())
}

fn build_backend(kind: BackendKind, auto_process: bool) -> Arc<dyn Backend> {
    let registry = Arc::new(InMemoryDataRegistry::new());
    match kind {
        BackendKind::Local => Arc::new(
            EngineBackend::new(Arc::new(LocalEngine::new()), registry)
                .with_auto_process(auto_process),
        ),
        BackendKind::Mock => Arc::new(MockBackend::new(registry)),
    }
}

/// Drive a workflow load to completion. A failed load leaves the server
/// running without a workflow.
async fn load_startup_workflow(backend: &dyn Backend, path: PathBuf) {
    let metadata = Metadata {
        uri: Some(path.display().to_string()),
    };
    let mut progress = backend.load_workflow(WorkflowSource::Path(path.clone()), Some(metadata));

    let mut last = None;
    while let Some(event) = progress.next().await {
        tracing::debug!(status = ?event.status, "{}", event.message);
        last = Some(event);
    }

    match last {
        Some(event) if event.status == LoadProgressStatus::Loaded => {
            tracing::info!(path = %path.display(), "Start-up workflow loaded");
        }
        Some(event) => {
            tracing::warn!(path = %path.display(), "Start-up workflow not loaded: {}", event.message);
        }
        None => {
            tracing::warn!(path = %path.display(), "Start-up workflow produced no progress");
        }
    }
}
