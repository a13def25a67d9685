//! Interactive session over a live retriever.

use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use ctxrank_core::traits::ChunkRepository;
use ctxrank_core::types::{ChunkType, ScoredChunk};
use ctxrank_hybrid::HybridRetriever;

use crate::ingest::{collect_paths, ingest_paths};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Stats,
    Ingest(Vec<PathBuf>),
    List { chunk_type: Option<ChunkType>, min_score: Option<f64> },
    Rate { id: String, rating: i64 },
    ShowWeights,
    SetWeights { w_vector: f64, w_reliability: f64, w_rating: f64 },
    Hybrid(Option<bool>),
    Query(String),
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(Command::Query(line.to_string()));
    }
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    match head {
        "/help" | "/h" => Ok(Command::Help),
        "/quit" | "/q" | "/exit" => Ok(Command::Quit),
        "/stats" | "/s" => Ok(Command::Stats),
        "/ingest" | "/i" => {
            if args.is_empty() {
                return Err("usage: /ingest <path> [path...]".into());
            }
            Ok(Command::Ingest(args.iter().map(PathBuf::from).collect()))
        }
        "/list" | "/l" => {
            let mut chunk_type = None;
            let mut min_score = None;
            for arg in args {
                if let Ok(score) = arg.parse::<f64>() {
                    min_score = Some(score);
                } else {
                    chunk_type = Some(arg.parse::<ChunkType>().map_err(|e| e.to_string())?);
                }
            }
            Ok(Command::List { chunk_type, min_score })
        }
        "/rate" | "/r" => match args.as_slice() {
            [id, rating] => {
                let rating = rating.parse::<i64>().map_err(|_| format!("not an integer rating: {rating}"))?;
                Ok(Command::Rate { id: (*id).to_string(), rating })
            }
            _ => Err("usage: /rate <chunk-id> <1-5>".into()),
        },
        "/weights" | "/w" => match args.as_slice() {
            [] => Ok(Command::ShowWeights),
            [v, rel, rat] => {
                let parse = |s: &str| s.parse::<f64>().map_err(|_| format!("not a number: {s}"));
                Ok(Command::SetWeights { w_vector: parse(*v)?, w_reliability: parse(*rel)?, w_rating: parse(*rat)? })
            }
            _ => Err("usage: /weights [<vector> <reliability> <rating>]".into()),
        },
        "/hybrid" => match args.as_slice() {
            [] => Ok(Command::Hybrid(None)),
            ["on"] => Ok(Command::Hybrid(Some(true))),
            ["off"] => Ok(Command::Hybrid(Some(false))),
            _ => Err("usage: /hybrid [on|off]".into()),
        },
        other => Err(format!("unknown command: {other} (try /help)")),
    }
}

pub fn format_listing(items: &[ScoredChunk]) -> String {
    let mut out = String::new();
    for (i, s) in items.iter().enumerate() {
        let c = &s.chunk;
        let preview: String = c.content.chars().take(80).collect();
        out.push_str(&format!(
            "{:>3}. {:.3}  {:<9} {:<10} rel={} rating={} base={:.2}  {}\n     {}\n",
            i + 1,
            s.effective_score,
            c.id,
            c.chunk_type.as_str(),
            c.source_reliability,
            c.avg_user_rating,
            c.base_vector_score,
            c.source,
            preview
        ));
    }
    out.push_str(&format!("{} results\n", items.len()));
    out
}

fn show_help() {
    println!("Commands:");
    println!("  /ingest <path...>        - Ingest files or directories");
    println!("  /list [TYPE] [MIN]       - List ranked chunks (TYPE: SOP LOG KB POLICY INGESTED)");
    println!("  /rate <id> <1-5>         - Rate a chunk");
    println!("  /weights [v rel rat]     - Show or set tuning weights");
    println!("  /hybrid [on|off]         - Toggle hybrid reranking");
    println!("  /stats                   - Corpus statistics");
    println!("  /quit                    - Exit");
    println!("  <query>                  - Retrieve context for a query");
}

pub async fn run<R>(retriever: Arc<HybridRetriever<R>>) -> Result<()>
where
    R: ChunkRepository + 'static,
{
    show_help();
    let mut last_query = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("ctxrank> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(c) => c,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        match command {
            Command::Help => show_help(),
            Command::Quit => break,
            Command::Stats => {
                let snapshot = retriever.store().snapshot();
                println!("{} chunks", snapshot.len());
                for t in ChunkType::ALL {
                    let n = snapshot.iter().filter(|c| c.chunk_type == t).count();
                    if n > 0 {
                        println!("  {t:<9} {n}");
                    }
                }
            }
            Command::Ingest(inputs) => {
                let report = ingest_paths(Arc::clone(&retriever), collect_paths(&inputs), true).await;
                println!("{} documents, {} chunks added", report.documents, report.chunks);
                for (path, reason) in &report.failures {
                    println!("  skipped {}: {reason}", path.display());
                }
            }
            Command::List { chunk_type, min_score } => {
                let min = min_score.unwrap_or(retriever.retrieval_config().default_min_score);
                print!("{}", format_listing(&retriever.list_ranked(&last_query, chunk_type, min)));
            }
            Command::Rate { id, rating } => match retriever.rate(&id, rating) {
                Ok(avg) => println!("{id} now rated {avg}/5"),
                Err(e) => println!("{e}"),
            },
            Command::ShowWeights => {
                let w = retriever.tuning().get();
                println!("vector={} reliability={} rating={} hybrid={}", w.w_vector, w.w_reliability, w.w_rating, w.hybrid_enabled);
                let adapted = retriever.weights_for(&last_query);
                println!(
                    "adapted for last query ({}): vector={:.3} reliability={:.3} rating={:.3}",
                    adapted.intent, adapted.w_vector, adapted.w_reliability, adapted.w_rating
                );
            }
            Command::SetWeights { w_vector, w_reliability, w_rating } => {
                let mut w = retriever.tuning().get();
                w.w_vector = w_vector;
                w.w_reliability = w_reliability;
                w.w_rating = w_rating;
                retriever.tuning().set(w);
                println!("weights updated");
            }
            Command::Hybrid(state) => {
                let on = match state {
                    Some(v) => {
                        retriever.tuning().set_hybrid_enabled(v);
                        v
                    }
                    None => retriever.tuning().toggle_hybrid(),
                };
                println!("hybrid reranking {}", if on { "on" } else { "off" });
            }
            Command::Query(q) => {
                let context = retriever.retrieve_context(&q);
                if context.is_empty() {
                    println!("(no chunks in the corpus)");
                } else {
                    println!("{context}");
                }
                last_query = q;
            }
        }
    }
    Ok(())
}
