//! CLI entry point for the fraudgraph analysis engine.
//!
//! Designed for subprocess invocation: reads a JSON graph snapshot from stdin
//! (or fetches it from Neo4j), writes a JSON fraud report to stdout.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use fraudgraph_core::config::load_analysis_config;
use fraudgraph_graph::{GraphClient, GraphConfig};
use fraudgraph_detect::{FraudEngine, GraphSnapshot};

#[derive(Parser)]
#[command(name = "fraudgraph")]
#[command(about = "Fraud pattern detection over a user/device/account/transaction graph")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Reference time for every window (RFC 3339). Defaults to the current time.
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Config file prefix (default: fraudgraph).
    #[arg(short, long, default_value = "fraudgraph", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a graph snapshot (reads JSON from stdin).
    Analyze,
    /// Fetch the full graph from Neo4j and analyze it.
    Scan,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut analysis = load_analysis_config(&cli.config)?;
    if cli.now.is_some() {
        analysis.now = cli.now;
    }

    let report = match cli.command {
        Command::Analyze => {
            let input = std::io::read_to_string(std::io::stdin())?;
            let snapshot: GraphSnapshot = serde_json::from_str(&input)?;
            fraudgraph_detect::run_analysis(snapshot, &analysis).await?
        }
        Command::Scan => {
            let graph_config = GraphConfig::load(&cli.config)?;
            let graph = GraphClient::connect(&graph_config).await?;
            let mut engine = FraudEngine::new(graph, analysis)?;
            engine.refresh().await?;
            engine.analyze().await?
        }
    };

    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
