//! xmem CLI and REST API entry point.
//!
//! Binary name: `xmem`
//!
//! Parses CLI arguments, initializes tracing, database, provider registry and
//! services, then dispatches to the appropriate command handler or starts the
//! REST API server together with the periodic source sync.

mod cli;
mod http;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use xmem_infra::sqlite::pool::default_data_dir;
use xmem_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut tracing_options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    tracing_options.json = cli.log_json;
    tracing_options.otel = cli.otel;
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Hashing a key needs no app state.
    if let Commands::HashKey { key } = &cli.command {
        println!("{}", http::extractors::auth::hash_api_key(key));
        return Ok(());
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    let state = AppState::init(data_dir).await?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            no_sync,
        } => serve(state, &host, port, no_sync).await?,

        Commands::Import { file, tenant } => {
            cli::memory::import_csv(&state, &file, &tenant, cli.json).await?;
        }

        Commands::Search {
            query,
            tenant,
            top_k,
            project,
            tags,
        } => {
            cli::memory::search(&state, &query, &tenant, top_k, project, tags, cli.json).await?;
        }

        Commands::Sync { tenant, due } => {
            cli::sync::sync(&state, tenant.as_deref(), due, cli.json).await?;
        }

        Commands::Stats { tenant } => {
            cli::stats::stats(&state, &tenant, cli.json).await?;
        }

        Commands::Provider { action } => {
            cli::provider::handle_provider_command(action, &state, cli.json).await?;
        }

        Commands::HashKey { .. } => unreachable!("handled above"),
    }

    Ok(())
}

async fn serve(state: AppState, host: &str, port: u16, no_sync: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let sync_task = if no_sync {
        None
    } else {
        let interval = Duration::from_secs(state.config.sync.poll_interval_secs.max(1));
        Some(Arc::clone(&state.scheduler).spawn_periodic(interval, cancel.clone()))
    };

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} xmem API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());
    tracing::info!(
        %addr,
        data_dir = %state.data_dir.display(),
        retrieval = state.memory_service.active_path()?,
        "server started"
    );

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Some(task) = sync_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "sync scheduler task ended abnormally");
        }
    }

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
}
