use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry::{DirectoryCorpus, Engine, MeasureKit, PorterStemmer, Progress, SearchConfig, SearchMode};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a positional inverted index", long_about = None)]
struct Cli {
    /// JSON file with search settings (top_k, jaccard_threshold, remove_stopwords, measure_max_results)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of .txt and .json files
    Build {
        /// Corpus directory
        #[arg(long)]
        input: PathBuf,
        /// Directory that receives the index/ folder (defaults to the corpus directory)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a query against a built index
    Query {
        /// Directory holding the index/ folder
        #[arg(long)]
        index: PathBuf,
        #[arg(long, default_value_t = SearchMode::Boolean)]
        mode: SearchMode,
        /// Maximum number of results to print
        #[arg(long)]
        top_k: Option<usize>,
        query: String,
    },
    /// Print every term of the index
    Vocab {
        #[arg(long)]
        index: PathBuf,
    },
    /// Suggest a spelling correction for a word
    Suggest {
        #[arg(long)]
        index: PathBuf,
        term: String,
    },
    /// Measure response time and mean average precision over a query file
    Measure {
        #[arg(long)]
        index: PathBuf,
        /// One query per line
        #[arg(long)]
        queries: PathBuf,
        /// Relevant document numbers per query, one line each
        #[arg(long)]
        qrel: PathBuf,
        #[arg(long, default_value_t = SearchMode::Ranked)]
        mode: SearchMode,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => SearchConfig::from_file(path).with_context(|| format!("reading config {}", path.display()))?,
        None => SearchConfig::default(),
    };

    match cli.command {
        Commands::Build { input, output } => build_index(&input, output.as_deref().unwrap_or(&input), config),
        Commands::Query { index, mode, top_k, query } => run_query(&index, mode, top_k, &query, config),
        Commands::Vocab { index } => {
            let engine = open(&index, config)?;
            for term in engine.vocabulary()? {
                println!("{term}");
            }
            Ok(())
        }
        Commands::Suggest { index, term } => {
            let engine = open(&index, config)?;
            match engine.suggest_correction(&term) {
                Some(s) => println!("{}", serde_json::to_string_pretty(&s)?),
                None => println!("no suggestion for {term:?}"),
            }
            Ok(())
        }
        Commands::Measure { index, queries, qrel, mode } => {
            let engine = open(&index, config)?;
            let kit = MeasureKit::load(&engine, &queries, &qrel)?;
            let measurement = kit.run(mode)?;
            println!("{}", serde_json::to_string_pretty(&measurement)?);
            Ok(())
        }
    }
}

fn open(index: &Path, config: SearchConfig) -> Result<Engine> {
    Engine::open(index, Box::new(PorterStemmer::default()), config)
        .with_context(|| format!("opening index at {}", index.display()))
}

fn build_index(input: &Path, output: &Path, config: SearchConfig) -> Result<()> {
    let corpus = DirectoryCorpus::open(input).with_context(|| format!("reading corpus {}", input.display()))?;
    let handle = Engine::spawn_build(corpus, Box::new(PorterStemmer::default()), config);

    for event in handle.progress.iter() {
        match event {
            Progress::DocumentIndexed { indexed, total, .. } if indexed % 1000 == 0 || indexed == total => {
                tracing::info!(indexed, total, "indexing documents");
            }
            Progress::TypeRegistered { registered, total } if registered % 10_000 == 0 || registered == total => {
                tracing::info!(registered, total, "registering grams");
            }
            Progress::DocumentSkipped { document_id, reason } => {
                tracing::warn!(document_id, %reason, "document skipped");
            }
            _ => {}
        }
    }

    let mut engine = handle.join()?;
    let meta = engine.write(output)?;
    tracing::info!(output = %output.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(())
}

fn run_query(index: &Path, mode: SearchMode, top_k: Option<usize>, query: &str, config: SearchConfig) -> Result<()> {
    let engine = open(index, config)?;
    let results = match top_k {
        Some(k) => engine.evaluate_top(query, mode, k)?,
        None => engine.evaluate(query, mode)?,
    };
    let hits: Vec<_> = results
        .hits
        .iter()
        .map(|hit| {
            json!({
                "doc_id": hit.document_id,
                "title": hit.title(),
                "path": hit.document.as_ref().and_then(|d| d.path.clone()),
                "score": hit.score,
                "matching_terms": hit.matching_terms,
            })
        })
        .collect();
    let output = json!({
        "query": query,
        "mode": mode,
        "total_hits": hits.len(),
        "accumulators": results.accumulators,
        "results": hits,
        "suggestions": results.suggestions,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    engine.close();
    Ok(())
}
