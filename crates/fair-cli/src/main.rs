//! FAIR indicator evaluation CLI
//!
//! The `fair` command evaluates one digital object against the FAIR
//! indicator catalog and prints the report as JSON.
//!
//! ## Commands
//!
//! - `evaluate`: resolve, route, harvest and score an identifier
//! - `classify`: show how an identifier is classified
//! - `route`: show which connector a domain routes to
//! - `catalog`: list the configured indicators

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, Level};

use fair_core::metrics::METRICS;
use fair_core::telemetry::init_tracing;
use fair_core::{
    classify, EvaluationRequest, FairConfig, HttpFetcher, ReqwestFetcher, Router, ServiceBuilder,
};

#[derive(Parser)]
#[command(name = "fair")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "FAIR indicator evaluation for DOIs, handles and repository items", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "FAIR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an item and print its FAIR report
    Evaluate {
        /// DOI, handle, UUID or repository-internal identifier
        #[arg(long)]
        id: String,

        /// Connector to use; "auto" routes by the resolved landing page
        #[arg(long, default_value = "auto")]
        repo: String,

        /// OAI-PMH base URL of the repository
        #[arg(long)]
        oai_base: Option<String>,

        /// Language for indicator labels
        #[arg(long)]
        lang: Option<String>,
    },

    /// Classify an identifier without any network access
    Classify {
        /// Identifier to classify
        raw: String,
    },

    /// Show the connector a domain routes to
    Route {
        /// Landing-page domain, e.g. zenodo.org
        domain: String,
    },

    /// List the configured indicator catalog
    Catalog,
}

#[derive(Serialize)]
struct EvaluationOutput<'a> {
    evaluation_id: String,
    generated_at: String,
    item: String,
    plugin: &'a str,
    endpoint: Option<&'a str>,
    duration_ms: u64,
    report: fair_core::ReportView,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json, level);

    // clap already folded FAIR_CONFIG into `cli.config`
    let config = FairConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    debug!(config = ?cli.config, "configuration loaded");

    let result = match cli.command {
        Commands::Evaluate {
            id,
            repo,
            oai_base,
            lang,
        } => cmd_evaluate(&config, id, repo, oai_base, lang).await,
        Commands::Classify { raw } => print_json(&classify(&raw)),
        Commands::Route { domain } => cmd_route(&config, &domain).await,
        Commands::Catalog => cmd_catalog(&config),
    };

    METRICS.flush();
    result
}

fn builder(config: &FairConfig) -> Result<ServiceBuilder> {
    let fetcher: Arc<dyn HttpFetcher> = Arc::new(
        ReqwestFetcher::new(config.http_client_config()).context("Failed to create HTTP client")?,
    );
    Ok(ServiceBuilder::from_config(fetcher, config)?)
}

async fn cmd_evaluate(
    config: &FairConfig,
    id: String,
    repo: String,
    oai_base: Option<String>,
    lang: Option<String>,
) -> Result<()> {
    let service = builder(config)?
        .build()
        .context("Invalid route table")?;

    let request = EvaluationRequest {
        id,
        repo: Some(repo),
        oai_base,
        lang,
    };
    let evaluation = service
        .evaluate(&request)
        .await
        .with_context(|| format!("Evaluation of '{}' failed", request.id))?;

    print_json(&EvaluationOutput {
        evaluation_id: evaluation.evaluation_id.to_string(),
        generated_at: evaluation.generated_at.to_rfc3339(),
        item: evaluation.item.to_string(),
        plugin: &evaluation.plugin,
        endpoint: evaluation.endpoint.as_deref(),
        duration_ms: evaluation.duration_ms,
        report: service.render(&evaluation, request.lang.as_deref()),
    })
}

async fn cmd_route(config: &FairConfig, domain: &str) -> Result<()> {
    let service = builder(config)?
        .build()
        .context("Invalid route table")?;
    let route = service.router().route(domain).await?;
    print_json(&route)
}

fn cmd_catalog(config: &FairConfig) -> Result<()> {
    let catalog = config.catalog().context("Invalid indicator catalog")?;
    let entries: Vec<serde_json::Value> = catalog
        .definitions()
        .iter()
        .map(|d| {
            serde_json::json!({
                "code": d.code,
                "principle": d.principle,
                "weight": d.weight,
                "name": d.name,
                "generic": catalog.has_default(&d.code),
            })
        })
        .collect();
    print_json(&entries)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
