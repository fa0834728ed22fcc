use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use scholar_hub_backend::api::{self, AppState};
use scholar_hub_backend::config::Config;
use scholar_hub_backend::services::citation_service::CitationService;
use scholar_hub_backend::services::crossref_client::CrossrefClient;
use scholar_hub_backend::services::oauth_service::OAuthService;
use scholar_hub_backend::services::orcid_client::OrcidClient;
use scholar_hub_backend::services::profile_sync_service::{ProfileSyncService, SyncOptions};
use scholar_hub_backend::db;
use scholar_hub_backend::services::scheduler_service;

#[derive(Parser)]
#[command(name = "scholar-hub", about = "Researcher identity platform backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Sync one researcher's ORCID profile into the database
    Sync {
        /// ORCID iD to sync (bare or URI form)
        #[arg(long)]
        orcid_id: String,
        /// Cap on works stored and looked up against CrossRef
        #[arg(long, default_value_t = 20)]
        max_publications: usize,
        /// Skip the CrossRef citation pipeline
        #[arg(long)]
        skip_citations: bool,
        /// Sync even when the profile was refreshed recently
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Sync {
            orcid_id,
            max_publications,
            skip_citations,
            force,
        } => {
            sync_one(
                config,
                &orcid_id,
                SyncOptions {
                    max_publications,
                    skip_citations,
                    force,
                },
            )
            .await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(pool.clone(), config)?);

    scheduler_service::spawn_all(pool, state.sync.clone());

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn sync_one(config: Config, orcid_id: &str, options: SyncOptions) -> anyhow::Result<()> {
    let pool = db::connect(&config.database_url).await?;
    let orcid = OrcidClient::new(config.orcid_api_base())?;
    // A client-credentials token raises the public API rate limit; the
    // public record is still readable without one.
    let orcid = match OAuthService::new(&config).client_credentials_token().await {
        Ok(token) => orcid.with_token(token.access_token),
        Err(e) => {
            tracing::warn!(error = %e, "client credentials grant failed, reading anonymously");
            orcid
        }
    };
    let crossref = CrossrefClient::new(&config.crossref_user_agent)?;
    let citations = CitationService::new(orcid.clone(), crossref);
    let sync = ProfileSyncService::new(pool, orcid, citations);

    let report = sync.sync(orcid_id, &options).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
