use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursegen::api::{self, AppState};
use coursegen::config::ServeArgs;
use coursegen::db::Database;
use coursegen::generator::GeminiGenerator;

#[derive(Parser)]
#[command(name = "coursegen")]
#[command(about = "AI-assisted course generation server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Apply database migrations and exit
    Migrate {
        /// Database file (defaults to the platform data directory)
        #[arg(long, env = "COURSEGEN_DB")]
        database: Option<std::path::PathBuf>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "coursegen=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(path: Option<std::path::PathBuf>) -> anyhow::Result<Database> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    db.migrate().context("Failed to run migrations")?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve(args) => {
            let db = open_database(args.database.clone())?;
            let generator = GeminiGenerator::new(&args.gemini_api_key, &args.gemini_model)
                .with_base_url(&args.gemini_base_url);

            let state = AppState::new(db, Arc::new(generator))
                .with_security(args.security()?)
                .with_generation_timeout(args.generation_timeout());
            let app = api::create_router(state);

            let addr = args.listen_addr();
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!("coursegen listening on http://{}", addr);

            axum::serve(listener, app).await?;
        }
        Commands::Migrate { database } => {
            open_database(database)?;
            tracing::info!("Migrations applied");
        }
    }

    Ok(())
}
