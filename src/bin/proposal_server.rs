//! HTTP service for proposal generation.
//!
//! Usage:
//!   proposal-server --docs-dir generated_docs --projects projects.json \
//!     [--bind 0.0.0.0:5000] [--sweep-secs 900]
//!
//! Every option can also come from the environment (or a `.env` file).

use anyhow::{Context, Result};
use clap::Parser;
use proposal_docs::catalog::{Catalog, CsvPriceSheet};
use proposal_docs::project::JsonProjectStore;
use proposal_docs::server::{router, AppState};
use proposal_docs::{DocumentGenerator, GeneratorConfig, Janitor, JanitorConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "proposal-server", about = "Serve proposal generation over HTTP")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "PROPOSAL_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Generated-documents directory (holds template.docx and the outputs)
    #[arg(long, env = "PROPOSAL_OUTPUT_DIR", default_value = "generated_docs")]
    docs_dir: PathBuf,

    /// Template path (defaults to <docs-dir>/template.docx)
    #[arg(long, env = "PROPOSAL_TEMPLATE")]
    template: Option<PathBuf>,

    /// Projects JSON file
    #[arg(long, env = "PROPOSAL_PROJECTS", default_value = "projects.json")]
    projects: PathBuf,

    /// Price sheet CSV (item name, price)
    #[arg(long, env = "PROPOSAL_PRICE_SHEET", default_value = "prices.csv")]
    price_sheet: PathBuf,

    /// Item catalog JSON (defaults are used when missing)
    #[arg(long, env = "PROPOSAL_CATALOG", default_value = "items.json")]
    catalog: PathBuf,

    /// Sweep interval and stale-file age, in seconds
    #[arg(
        long,
        env = "PROPOSAL_SWEEP_SECS",
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    sweep_secs: u64,

    /// Wait before retrying a failed delete, in milliseconds
    #[arg(long, env = "PROPOSAL_RETRY_MS", default_value_t = 1000)]
    retry_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.docs_dir)
        .with_context(|| format!("Failed to create {}", cli.docs_dir.display()))?;
    let template = cli
        .template
        .clone()
        .unwrap_or_else(|| cli.docs_dir.join("template.docx"));
    if !template.exists() {
        log::warn!(
            "Template {} does not exist yet; generation will fail until it does",
            template.display()
        );
    }

    let janitor = Arc::new(Janitor::new(JanitorConfig {
        dir: cli.docs_dir.clone(),
        sweep_interval: Duration::from_secs(cli.sweep_secs),
        retry_delay: Duration::from_millis(cli.retry_ms),
    }));
    let sweeper = janitor.spawn_sweeper();

    let catalog = Catalog::load(&cli.catalog, Box::new(CsvPriceSheet::new(&cli.price_sheet)))?;
    let state = Arc::new(AppState {
        generator: DocumentGenerator::new(GeneratorConfig {
            template,
            output_dir: cli.docs_dir.clone(),
        }),
        janitor,
        projects: Arc::new(JsonProjectStore::new(&cli.projects)),
        catalog,
    });

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    log::info!("Listening on http://{}", cli.bind);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    log::info!("Shutting down");
    sweeper.shutdown();
    Ok(())
}
