use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use routeai::config::LoggingConfig;
use routeai::{
    ClusterOptions, JsonCatalogRepository, MatchMode, RecommendationRequest, RecommendationService, RouteAiConfig,
};

#[derive(Parser)]
#[command(name = "routeai", version, about = "Keyword driven travel route recommendations")]
struct Cli {
    /// Path to a config TOML file (defaults to <config dir>/routeai/config.toml)
    #[arg(long, global = true, env = "ROUTEAI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recommend routes for a set of keywords
    Recommend(RecommendArgs),
    /// Print the effective configuration
    CheckConfig,
}

#[derive(Args)]
struct RecommendArgs {
    /// JSON catalog with `spots` and `routes`
    #[arg(long)]
    catalog: PathBuf,

    /// Search keyword, repeatable
    #[arg(long = "keyword", short = 'k', required = true)]
    keywords: Vec<String>,

    /// Only consider stored routes in this region
    #[arg(long)]
    region: Option<String>,

    /// How keywords combine when filtering stored routes
    #[arg(long, value_enum, default_value_t = MatchMode::Any)]
    mode: MatchMode,

    /// Maximum number of stored routes to return
    #[arg(long)]
    max_routes: Option<usize>,

    /// Clustering radius in kilometres
    #[arg(long)]
    radius_km: Option<f64>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    // stdout carries the JSON result
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.config.clone() {
        Some(path) => RouteAiConfig::load_from_path(Some(path)),
        None => RouteAiConfig::load(),
    }
    .context("Failed to load configuration")?;
    init_tracing(&config.logging);
    debug!("Configuration loaded");

    match cli.command {
        Command::Recommend(args) => recommend(&config, args).await,
        Command::CheckConfig => check_config(&config),
    }
}

async fn recommend(config: &RouteAiConfig, args: RecommendArgs) -> Result<()> {
    let repository = Arc::new(JsonCatalogRepository::load(&args.catalog)?);
    let service = RecommendationService::from_config(repository, config)?;

    let mut request = RecommendationRequest::new(args.keywords).with_mode(args.mode);
    request.region = args.region;
    request.max_routes = args.max_routes;
    if let Some(radius) = args.radius_km {
        request.cluster_options = Some(ClusterOptions {
            proximity_radius_km: radius,
            ..config.clustering.options()
        });
    }

    info!("Recommending routes for {:?}", request.keywords);
    let result = service.recommend_or_degrade(&request).await;
    debug!(stats = ?service.cache_stats(), "Cache statistics");

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn check_config(config: &RouteAiConfig) -> Result<()> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("********".to_string());
    }
    if let Some(path) = RouteAiConfig::get_config_path() {
        info!("Default config path: {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
