use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use ragdb_cli::load_documents;
use ragdb_core::config::RetrievalConfig;
use ragdb_embed::{HashEmbedder, OverlapScorer};
use ragdb_hybrid::HybridEngine;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut query = None;
    let mut corpus_dir = None;
    let mut k = 3usize;
    let mut json = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => json = true,
            "-k" | "--top-k" => {
                let value = args.get(i + 1).and_then(|v| v.parse::<usize>().ok());
                match value {
                    Some(parsed) => {
                        k = parsed;
                        i += 1;
                    }
                    None => {
                        eprintln!("Error: {} requires a number", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            arg if !arg.starts_with('-') => {
                if query.is_none() {
                    query = Some(arg.to_string());
                } else {
                    corpus_dir = Some(PathBuf::from(arg));
                }
            }
            _ => {}
        }
        i += 1;
    }
    let Some(query) = query else {
        eprintln!("Usage: ragdb-search <query> [corpus_dir] [-k N] [--json]");
        eprintln!("Example: ragdb-search 'pho recipe' ./docs -k 3");
        std::process::exit(1);
    };
    let corpus_dir = corpus_dir.unwrap_or_else(|| PathBuf::from("./docs"));

    let config = RetrievalConfig::load().context("loading config")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("indexing {}", corpus_dir.display()));
    let build_start = Instant::now();
    let documents = load_documents(&corpus_dir)?;
    let engine = HybridEngine::build(
        &documents,
        Some(Arc::new(HashEmbedder::default())),
        Arc::new(OverlapScorer),
        config,
    )?;
    spinner.finish_and_clear();
    println!(
        "📚 Indexed {} documents ({} chunks) in {:.2?}",
        documents.len(),
        engine.chunk_count(),
        build_start.elapsed()
    );

    let outcome = engine.retrieve(&query, k, None)?;
    if outcome.lexical_only {
        println!("⚠️  Embedder unavailable; results are lexical-only");
    }
    if outcome.dropped_pairs > 0 {
        println!("⚠️  {} candidate pairs failed scoring and were dropped", outcome.dropped_pairs);
    }

    if json {
        let passages: Vec<_> = outcome
            .results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "text": r.chunk.text,
                    "source": r.chunk.source,
                    "page": r.chunk.page,
                    "score": r.score,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&passages)?);
        return Ok(());
    }

    println!("\n🔍 Top {} results for: \"{}\"", outcome.results.len(), query);
    for (i, result) in outcome.results.iter().enumerate() {
        let snippet: String = result.chunk.text.chars().take(120).collect();
        println!(
            "\n  {}. score={:.4}  source={}  page={}",
            i + 1,
            result.score,
            result.chunk.source,
            result.chunk.page
        );
        println!("     📝 {}", snippet.replace('\n', " "));
    }
    Ok(())
}
