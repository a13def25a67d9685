use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ctxrank_cli::ingest::{collect_paths, ingest_paths, IngestReport};
use ctxrank_cli::shell;
use ctxrank_core::config::{expand_path, resolve_with_base, Config};
use ctxrank_core::seed::demo_corpus;
use ctxrank_core::types::ChunkType;
use ctxrank_hybrid::HybridRetriever;

#[derive(Parser)]
#[command(name = "ctxrank", version, about = "Adaptive hybrid reranking of retrieved context")]
struct Cli {
    /// Directory holding config.toml and its per-environment overlays
    #[arg(long, default_value = ".")]
    config_dir: String,

    /// Start from the built-in demo corpus
    #[arg(long)]
    seed_demo: bool,

    /// Files or directories to ingest before running the command
    #[arg(long = "docs")]
    docs: Vec<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and report what was added
    Ingest {
        paths: Vec<PathBuf>,
    },
    /// Print the assembled context for a query
    Query {
        text: String,
    },
    /// List chunks ranked for a query
    List {
        query: Option<String>,
        #[arg(long = "type")]
        chunk_type: Option<ChunkType>,
        #[arg(long)]
        min_score: Option<f64>,
        #[arg(long)]
        json: bool,
    },
    /// Rate a chunk from 1 to 5
    Rate {
        id: String,
        #[arg(allow_negative_numbers = true)]
        rating: i64,
    },
    /// Interactive session
    Shell,
}

fn print_report(report: &IngestReport) {
    println!("{} documents, {} chunks added", report.documents, report.chunks);
    for (path, reason) in &report.failures {
        eprintln!("  skipped {}: {reason}", path.display());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with_target(false)
        .init();

    let config_dir = expand_path(&cli.config_dir);
    let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config = Config::load_from(&config_dir, &env_name)?;
    let settings = config.engine()?;

    let seed = if cli.seed_demo { demo_corpus() } else { Vec::new() };
    let retriever = Arc::new(HybridRetriever::from_settings(&settings, seed)?);

    let mut inputs = cli.docs.clone();
    if let Commands::Ingest { paths } = &cli.command {
        inputs.extend(paths.iter().cloned());
    }
    if inputs.is_empty() {
        if let Ok(dir) = config.get::<String>("data.docs_dir") {
            let dir = resolve_with_base(&config_dir, dir);
            if dir.is_dir() {
                inputs.push(dir);
            }
        }
    }
    let paths = collect_paths(&inputs);
    if !paths.is_empty() {
        info!(documents = paths.len(), "ingesting");
    }
    let report = ingest_paths(Arc::clone(&retriever), paths, true).await;

    match cli.command {
        Commands::Ingest { .. } => print_report(&report),
        Commands::Query { text } => {
            let context = retriever.retrieve_context(&text);
            if context.is_empty() {
                println!("(no chunks in the corpus)");
            } else {
                println!("{context}");
            }
        }
        Commands::List { query, chunk_type, min_score, json } => {
            let min = min_score.unwrap_or(retriever.retrieval_config().default_min_score);
            let items = retriever.list_ranked(query.as_deref().unwrap_or_default(), chunk_type, min);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print!("{}", shell::format_listing(&items));
            }
        }
        Commands::Rate { id, rating } => {
            let avg = retriever.rate(&id, rating)?;
            println!("{id} now rated {avg}/5");
        }
        Commands::Shell => shell::run(retriever).await?,
    }
    Ok(())
}
