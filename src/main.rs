use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use extgate::clock::SystemClock;
use extgate::store::memory::InMemoryStore;
use extgate::store::postgres::PgStore;
use extgate::tokens::TokenService;
use extgate::{api, cli, config, jobs, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // EXTGATE_LOG_FORMAT=json switches to one JSON object per line for log shipping
    let json_logs = std::env::var("EXTGATE_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);
    let (json_layer, text_layer) = if json_logs {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "extgate=debug,tower_http=debug".into()),
        ))
        .with(json_layer)
        .with(text_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port, in_memory }) => {
            let port = port.unwrap_or(cfg.port);
            if in_memory {
                run_in_memory(cfg, port).await
            } else {
                run_server(cfg, port).await
            }
        }
        Some(cli::Commands::Token { command }) => {
            let db = PgStore::connect(&cfg.database_url, cfg.db_max_connections).await?;
            let tokens = TokenService::new(
                Arc::new(db.clone()),
                Arc::new(db),
                Arc::new(SystemClock),
                cfg.token_ttl(),
            );
            handle_token_command(command, &tokens).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url, cfg.db_max_connections)
        .await
        .context("failed to connect to database")?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let state = Arc::new(AppState::new(db, Arc::new(SystemClock), cfg));
    serve(state, port).await
}

async fn run_in_memory(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::warn!("Running with in-memory store; all tokens are lost on exit");
    let state = Arc::new(AppState::new(InMemoryStore::new(), Arc::new(SystemClock), cfg));
    serve(state, port).await
}

async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    if state.config.purge_interval_secs > 0 {
        jobs::cleanup::spawn(
            state.tokens.clone(),
            Duration::from_secs(state.config.purge_interval_secs),
            chrono::Duration::hours(state.config.purge_retention_hours),
        );
        tracing::info!(
            every_secs = state.config.purge_interval_secs,
            retention_hours = state.config.purge_retention_hours,
            "Background token purge job started"
        );
    }

    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("extgate listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn handle_token_command(cmd: cli::TokenCommands, tokens: &TokenService) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Issue { user_id } => {
            let user_id = uuid::Uuid::parse_str(&user_id).context("Invalid user_id")?;
            let issued = tokens.issue(user_id).await?;
            println!(
                "Token issued:\n  User:     {}\n  Expires:  {}\n  Token:    {}",
                user_id, issued.info.expires_at, issued.token
            );
        }
        cli::TokenCommands::Revoke { token } => {
            tokens.revoke(&token).await?;
            println!("Token revoked.");
        }
        cli::TokenCommands::Purge { older_than_hours } => {
            let purged =
                jobs::cleanup::purge_once(tokens, chrono::Duration::hours(older_than_hours)).await?;
            println!("Purged {} expired token(s).", purged);
        }
    }
    Ok(())
}
