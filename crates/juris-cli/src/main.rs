//! Juris CLI: precedent index maintenance, similarity search, and
//! case-level aggregation of per-document extraction files.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use juris_ai::{HashingEncoder, ModelRegistry};
use juris_retrieval::PrecedentSearchService;
use juris_store::IndexStore;

mod analyze;

#[derive(Parser)]
#[command(name = "juris", version, about = "Legal precedent retrieval and case aggregation")]
struct Cli {
    /// Directory holding the persisted precedent index.
    #[arg(long, default_value = "precedent_index", env = "JURIS_DATA_DIR")]
    data_dir: PathBuf,

    /// Directory with model.onnx + tokenizer.json (requires an `onnx` build).
    #[arg(long, env = "JURIS_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Use the deterministic hashing encoder instead of a model.
    #[arg(long, conflicts_with = "model_dir")]
    hashing_encoder: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed a precedent text and append it to the index.
    Add {
        /// Precedent text; use --file to read it from disk instead.
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Caller-supplied case id; derived from content when omitted.
        #[arg(long)]
        id: Option<String>,
    },
    /// Search the index for precedents similar to the query text.
    Search {
        text: String,
        /// Number of precedents to retrieve (1 to 100).
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Merge per-document extraction JSON files into one case record.
    Analyze {
        /// Per-document extraction files.
        files: Vec<PathBuf>,
        #[arg(long)]
        case_id: Option<String>,
    },
    /// Print the number of stored precedents.
    Count,
    /// Delete every stored precedent.
    Clear,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let registry = build_registry(&cli)?;
    let dim = registry.dim().unwrap_or(juris_core::index::DEFAULT_DIM);
    let store = IndexStore::open(&cli.data_dir, dim)
        .with_context(|| format!("opening index at {}", cli.data_dir.display()))?;
    let service = PrecedentSearchService::new(registry, store);

    match cli.command {
        Command::Add { text, file, id } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => anyhow::bail!("provide TEXT or --file"),
            };
            let receipt = service.add_precedent(&text, id.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Search { text, top_k } => {
            let report = service.find_similar(&text, top_k)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Analyze { files, case_id } => {
            anyhow::ensure!(!files.is_empty(), "no extraction files provided");
            let case_id = case_id.unwrap_or_else(|| {
                format!("case_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
            });
            let record = analyze::run(&service, &case_id, &files);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Count => {
            println!("{}", service.count());
        }
        Command::Clear => {
            service.clear()?;
            eprintln!("All precedents cleared");
        }
    }
    Ok(())
}

fn build_registry(cli: &Cli) -> anyhow::Result<ModelRegistry> {
    if let Some(model_dir) = &cli.model_dir {
        #[cfg(feature = "onnx")]
        {
            let encoder = juris_ai::OnnxEncoder::load(model_dir)
                .with_context(|| format!("loading ONNX model from {}", model_dir.display()))?;
            return Ok(ModelRegistry::with_encoder(Box::new(encoder)));
        }
        #[cfg(not(feature = "onnx"))]
        anyhow::bail!(
            "this build has no ONNX support; rebuild with --features onnx to load {}",
            model_dir.display()
        );
    }
    if cli.hashing_encoder {
        return Ok(ModelRegistry::with_encoder(Box::new(
            HashingEncoder::with_default_dim(),
        )));
    }
    // No encoder installed: searches degrade to empty results, adds fail.
    Ok(ModelRegistry::new())
}
