mod api;
mod router;
mod sse;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use plotline_core::Config;
use plotline_domains::{build_dispatcher, DOMAINS};
use plotline_mcp::{McpService, StdioTransport};
use plotline_store::{Capabilities, PgRecordStore, RecordStore};

fn load_config() -> Config {
    plotline_core::config::load_dotenv();
    Config::from_env()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Connect the store, probe optional tables, and assemble the registry.
/// Any failure here exits the process non-zero before a transport opens.
async fn boot(config: &Config) -> anyhow::Result<McpService> {
    let pg = PgRecordStore::connect(&config.postgres).await?;
    pg.migrate().await?;
    let store: Arc<dyn RecordStore> = Arc::new(pg);

    let capabilities = Capabilities::probe(store.as_ref()).await?;
    let dispatcher = build_dispatcher(
        store,
        &capabilities,
        Duration::from_secs(config.dispatch.tool_timeout_secs),
    )?;
    info!(tools = dispatcher.catalog().len(), "tool registry assembled");

    Ok(McpService::new(Arc::new(dispatcher)))
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();
    let service = boot(config).await?;

    let state = Arc::new(state::AppState {
        service,
        domains: DOMAINS.to_vec(),
        sessions: Default::default(),
    });
    let app = router::build(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");

    Ok(())
}

async fn stdio(config: &Config) -> anyhow::Result<()> {
    let service = boot(config).await?;
    let mut transport = StdioTransport::new();
    service.run(&mut transport).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mode = args.get(1).map(|s| s.as_str());

    // In stdio mode stdout carries only protocol frames, so the log sink
    // is chosen before anything can emit a line.
    if mode == Some("stdio") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .init();
    }

    let config = load_config();

    match mode {
        Some("serve") => serve(&config).await?,
        Some("stdio") => stdio(&config).await?,
        _ => {
            println!("plotline v{}", env!("CARGO_PKG_VERSION"));
            println!("Usage: plotline-server <command>");
            println!("  serve   Start the HTTP/SSE server");
            println!("  stdio   Speak MCP over stdin/stdout");
        }
    }

    Ok(())
}
