use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scopegate::auth::Hs256Verifier;
use scopegate::cli::{ImportArgs, init_store, run_import, run_init};
use scopegate::config::ServerConfig;
use scopegate::ingest::FileSystemIngestion;
use scopegate::server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "scopegate")]
#[command(about = "Scope-based access control for chat memory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory, database and token secret
    Init {
        /// Data directory for the database and ingested documents
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },

    /// Start the server
    Serve {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and ingested documents
        #[arg(long)]
        data_dir: Option<String>,
    },

    /// Import files and folders into the memory store
    Import(ImportArgs),
}

fn server_config(
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match config {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir.into();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scopegate=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            let config = ServerConfig {
                data_dir: data_dir.into(),
                ..ServerConfig::default()
            };
            run_init(&config)?;
        }
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => {
            let config = server_config(config, host, port, data_dir)?;
            let store = init_store(&config)?;
            let secret = config.resolve_jwt_secret()?;
            let verifier = Hs256Verifier::new(&secret, config.jwt_audience.as_deref());
            let ingestion = FileSystemIngestion::new(&config.data_dir);

            let addr = config.socket_addr()?;
            let state = Arc::new(AppState::new(
                Arc::new(store),
                Arc::new(ingestion),
                Arc::new(verifier),
                config,
            ));
            let shutdown = state.shutdown.clone();
            let app = create_router(state);

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for shutdown signal: {e}");
                        std::future::pending::<()>().await;
                    }
                    info!("Shutting down");
                    shutdown.cancel();
                })
                .await?;
        }
        Commands::Import(args) => {
            run_import(args).await?;
        }
    }

    Ok(())
}
