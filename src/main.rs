mod backend;
mod config;
mod model;
mod routes;
mod services;
mod state;

use clap::{Parser, Subcommand};

use crate::backend::{BackendError, Backends};
use crate::config::{AppConfig, BackendMode, ConfigError};
use crate::services::auth::{AuthError, SignInInput};

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("backend: {0}")]
    Backend(#[from] BackendError),
    #[error("seed host sign-in failed: {0}")]
    SeedSignIn(#[from] AuthError),
    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "havenhub", about = "HavenHub vacation-rental marketplace server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Insert the sample listings as the given host.
    Seed {
        #[arg(long, env = "SEED_HOST_EMAIL")]
        email: String,
        #[arg(long, env = "SEED_HOST_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "havenhub exited with error");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;
    if config.mode == BackendMode::Memory {
        tracing::warn!("using in-memory backend; data is lost on restart");
    }
    let backends = Backends::from_config(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(backends, config).await,
        Command::Seed { email, password } => {
            let register = config.mode == BackendMode::Memory;
            seed(&backends, SignInInput { email, password }, register).await
        }
    }
}

async fn serve(backends: Backends, config: AppConfig) -> Result<(), StartupError> {
    let port = config.port;
    let state = state::AppState::new(backends, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .map_err(|source| StartupError::Bind { port, source })?;

    tracing::info!(%port, "havenhub listening");
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}

/// In memory mode the host account is registered first, since the
/// backend starts empty.
async fn seed(backends: &Backends, credentials: SignInInput, register: bool) -> Result<(), StartupError> {
    services::seed::seed_as(backends.identity.as_ref(), backends.store.as_ref(), &credentials, register).await?;
    Ok(())
}
