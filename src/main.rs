use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use lode_core::{CompletionStatus, Config, Pipeline, PipelineReport, snapshot};
use lode_index::display_header;
use lode_llm::{EmbeddingProvider, StatusTx};
use lode_source::{Corpus, RepositoryLocator, TreeFetcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(
    name = "lode",
    version,
    about = "Fetch a GitHub source tree, chunk it, and build an embedding index"
)]
struct Cli {
    /// Config file (falls back to LODE_CONFIG, then config/default.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk a repository and write a corpus snapshot
    Fetch {
        #[command(flatten)]
        repo: RepoArgs,
        /// Corpus snapshot path (defaults to output.corpus_path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch, segment and index a repository
    Index {
        #[command(flatten)]
        repo: OptionalRepoArgs,
        /// Index a saved corpus snapshot instead of fetching
        #[arg(long, conflicts_with = "repo")]
        from_corpus: Option<PathBuf>,
        /// Index path (defaults to output.index_path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Rank indexed segments by similarity to a query
    Query {
        /// Index path (defaults to output.index_path)
        #[arg(long)]
        index: Option<PathBuf>,
        text: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
struct RepoArgs {
    /// owner/name, optionally suffixed with @branch or #commit
    repo: String,
    #[arg(long, conflicts_with = "commit")]
    branch: Option<String>,
    #[arg(long)]
    commit: Option<String>,
}

#[derive(Args, Debug)]
struct OptionalRepoArgs {
    /// owner/name, optionally suffixed with @branch or #commit
    #[arg(required_unless_present = "from_corpus")]
    repo: Option<String>,
    #[arg(long, conflicts_with = "commit")]
    branch: Option<String>,
    #[arg(long)]
    commit: Option<String>,
}

fn resolve_locator(
    repo: &str,
    branch: Option<&str>,
    commit: Option<&str>,
) -> anyhow::Result<RepositoryLocator> {
    let mut locator: RepositoryLocator = repo
        .parse()
        .with_context(|| format!("invalid repository '{repo}'"))?;
    if let Some(b) = branch {
        locator = locator.with_branch(b);
    }
    if let Some(c) = commit {
        locator = locator.with_commit(c);
    }
    Ok(locator)
}

fn resolve_config_path(arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = arg {
        return path;
    }
    if let Ok(path) = std::env::var("LODE_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        token.cancel();
    });
}

/// Print progress messages to stderr until every sender is dropped.
fn spawn_status_printer() -> StatusTx {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            eprintln!("{msg}");
        }
    });
    tx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Command::Fetch { repo, out } => {
            let locator =
                resolve_locator(&repo.repo, repo.branch.as_deref(), repo.commit.as_deref())?;
            let out = out.unwrap_or_else(|| config.output.corpus_path.clone());
            fetch(&config, &locator, &out, &cancel).await
        }
        Command::Index {
            repo,
            from_corpus,
            out,
        } => {
            let out = out.unwrap_or_else(|| config.output.index_path.clone());
            let target = match (from_corpus, repo.repo) {
                (Some(path), _) => IndexTarget::Snapshot(path),
                (None, Some(r)) => IndexTarget::Remote(resolve_locator(
                    &r,
                    repo.branch.as_deref(),
                    repo.commit.as_deref(),
                )?),
                (None, None) => bail!("a repository or --from-corpus is required"),
            };
            index(&config, target, &out, &cancel).await
        }
        Command::Query { index, text, limit } => {
            let path = index.unwrap_or_else(|| config.output.index_path.clone());
            query(&config, &path, &text, limit).await
        }
    }
}

async fn fetch(
    config: &Config,
    locator: &RepositoryLocator,
    out: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    config.validate()?;
    let fetcher = TreeFetcher::new(config.github_source()?, config.fetch_config());
    let corpus = fetcher
        .fetch(locator, cancel)
        .await
        .with_context(|| format!("failed to fetch {locator}"))?;
    snapshot::save_corpus(&corpus, out)?;
    print_corpus_summary(&corpus);
    println!("wrote corpus: {}", out.display());
    Ok(())
}

enum IndexTarget {
    Remote(RepositoryLocator),
    Snapshot(PathBuf),
}

async fn index(
    config: &Config,
    target: IndexTarget,
    out: &Path,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let status_tx = spawn_status_printer();
    let mut embedder = config.build_embedder()?;
    embedder.set_status_tx(status_tx.clone());
    let pipeline =
        Pipeline::new(config.github_source()?, embedder, config)?.with_status_tx(status_tx);

    let output = match target {
        IndexTarget::Remote(locator) => pipeline.run(&locator, cancel).await?,
        IndexTarget::Snapshot(path) => {
            let corpus = snapshot::load_corpus(&path)?;
            pipeline.index_corpus(corpus, cancel).await?
        }
    };

    print_corpus_summary(&output.corpus);
    print_report(&output.report);

    if output.report.completion == CompletionStatus::NothingIndexed && output.report.segments > 0
    {
        bail!(
            "nothing indexed: {}",
            output.report.failure.as_deref().unwrap_or("unknown failure")
        );
    }
    snapshot::save_index(&output.handle, out)?;
    println!("wrote index: {} ({} segments)", out.display(), output.handle.len());
    Ok(())
}

async fn query(config: &Config, path: &Path, text: &str, limit: usize) -> anyhow::Result<()> {
    let handle = snapshot::load_index(path)?;
    let Some(dimension) = handle.dimension() else {
        println!("index is empty");
        return Ok(());
    };

    let embedder = config.build_embedder()?;
    let vectors = embedder
        .embed_batch(&[text.to_owned()])
        .await
        .context("failed to embed query")?;
    let Some(vector) = vectors.into_iter().next() else {
        bail!("{} returned no vector for the query", embedder.name());
    };
    if vector.len() != dimension {
        bail!(
            "query vector has dimension {}, index has {dimension}; was it built with another model?",
            vector.len()
        );
    }

    for (rank, hit) in handle.search(&vector, limit).iter().enumerate() {
        println!("{}. [{:.3}] {}", rank + 1, hit.score, display_header(hit.segment));
        for line in hit.segment.text().lines().take(3) {
            println!("    {line}");
        }
    }
    Ok(())
}

fn print_corpus_summary(corpus: &Corpus) {
    println!(
        "files: {} kept, {} skipped ({} lines)",
        corpus.len(),
        corpus.skipped.len(),
        corpus.total_lines()
    );
    for skipped in &corpus.skipped {
        println!("  skipped {}: {}", skipped.path, skipped.reason);
    }
}

fn print_report(report: &PipelineReport) {
    println!(
        "segments: {} ({} invalid, {} empty, {} truncated)",
        report.segments, report.dropped_invalid, report.dropped_empty, report.truncated
    );
    println!(
        "batches: {}/{} in {} attempts, {} ms",
        report.index.batches_succeeded,
        report.index.batches_total,
        report.index.attempts,
        report.index.duration_ms
    );
    println!("status: {}", report.completion);
    if let Some(failure) = &report.failure {
        println!("stopped early: {failure}");
    }
}
