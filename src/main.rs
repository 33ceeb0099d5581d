use clap::Parser;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use readmark::config::ServerConfig;
use readmark::web::create_axum_router;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on, overrides LISTEN_ADDR
    #[arg(short, long)]
    listen: Option<String>,
}

fn init_logging() {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "readmark.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();
    dotenv().ok();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load server configuration: {}", e);
            return Err(e.into());
        }
    };
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    let config = Arc::new(config);

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL must be set in the environment or .env file")?;
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let app = create_axum_router(db_pool, config.clone());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("readmark API listening on {}", config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
