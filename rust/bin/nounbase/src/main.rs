//! `nounbase`: query an in-memory noun store from the command line.
//!
//! Usage:
//!   nounbase -c nounbase.toml [--seed data.json] <command>
//!
//! The config declares the nouns (and cache/batch options); the seed file
//! fills them with `{ "Noun": [records...] }`. Results are printed as JSON.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use commands::Context;

/// Nounbase CLI.
#[derive(Parser, Debug)]
#[command(name = "nounbase", about = "Schema-driven in-memory noun store")]
struct Cli {
    /// Path to the TOML config declaring nouns.
    #[arg(short = 'c', long = "config", required = true)]
    config: PathBuf,

    /// JSON seed file: an object mapping noun names to record arrays.
    #[arg(long = "seed")]
    seed: Option<PathBuf>,

    /// Bypass the query cache.
    #[arg(long = "no-cache", global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get records by id, relations resolved. Ids are batched into one load.
    Get {
        /// Noun name (e.g. Customer).
        noun: String,
        /// One or more record ids.
        #[arg(required = true)]
        ids: Vec<String>,
        /// Resolve only these relation fields (repeatable).
        #[arg(long)]
        include: Vec<String>,
        /// Do not resolve relation fields.
        #[arg(long, conflicts_with = "include")]
        raw: bool,
    },

    /// List records in insertion order.
    List {
        noun: String,
        /// Limit results.
        #[arg(long)]
        limit: Option<usize>,
        /// Offset for pagination.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Find records matching every key of a JSON object.
    Find {
        noun: String,
        /// Filter, e.g. '{"tier":"pro"}'.
        filter: String,
    },

    /// Case-insensitive text search.
    Search {
        noun: String,
        query: String,
        /// Rank results by matched words and attach a score.
        #[arg(long)]
        semantic: bool,
    },

    /// Print a noun's parsed schema.
    Schema { noun: String },

    /// Print registered nouns with their record counts.
    Nouns,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("Loading configuration from {}", cli.config.display());
    let ctx = Context::open(&cli.config, cli.seed.as_deref(), !cli.no_cache)?;

    let output = match cli.command {
        Commands::Get {
            noun,
            ids,
            include,
            raw,
        } => {
            let include = if raw { Some(Vec::new()) } else { (!include.is_empty()).then_some(include) };
            ctx.get(&noun, ids, include).await?
        }
        Commands::List {
            noun,
            limit,
            offset,
        } => ctx.list(&noun, limit, offset)?,
        Commands::Find { noun, filter } => ctx.find(&noun, &filter)?,
        Commands::Search {
            noun,
            query,
            semantic,
        } => ctx.search(&noun, &query, semantic)?,
        Commands::Schema { noun } => ctx.schema(&noun)?,
        Commands::Nouns => ctx.nouns(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
