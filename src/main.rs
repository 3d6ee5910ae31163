//! # folio CLI
//!
//! Command-line access to the chapter content engine.
//!
//! ## Subcommands
//!
//! - `fetch`: assemble one chapter from a source definition and store it
//! - `catalog`: show the stored catalog of a book
//!
//! Logs go to stderr (filtered by `RUST_LOG`); chapter text and catalog output go to
//! stdout. Ctrl-C cancels a running fetch without storing a partial chapter.

mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use folio::book::{Book, BookSource, Chapter};
use folio::content::{ChapterContentService, ContentConfig, DEFAULT_CONCURRENCY};
use folio::fetch::{FetchConfig, FetchTarget, Fetcher, HttpFetcher};
use folio::store::{FileContentStore, StorageConfig, XmlChapterStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Rule-driven chapter content assembly", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch one chapter and store its text
    Fetch(FetchArgs),

    /// Print the stored catalog of a book
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Book source definition (JSON)
    #[arg(short, long, required = true)]
    source: PathBuf,

    /// URL of the chapter's first page
    #[arg(required = true)]
    url: String,

    /// URL of the book the chapter belongs to (defaults to the chapter URL)
    #[arg(short, long)]
    book: Option<String>,

    /// URL of the following chapter, where page chains stop
    #[arg(short, long)]
    next_chapter: Option<String>,

    /// Catalog title of the chapter
    #[arg(short, long, default_value = "")]
    title: String,

    /// Catalog index of the chapter
    #[arg(short, long, default_value = "0")]
    index: u32,

    /// The chapter is a volume heading without text of its own
    #[arg(long)]
    volume: bool,

    /// Storage directory
    #[arg(short, long, default_value = ".folio/books")]
    output: PathBuf,

    /// Concurrent continuation-page fetches
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Request quota per minute
    #[arg(short, long)]
    rate: Option<u32>,

    /// Print the chapter without storing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// URL of the book
    #[arg(required = true)]
    book: String,

    /// Storage directory
    #[arg(short, long, default_value = ".folio/books")]
    output: PathBuf,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing_subscriber(cli.verbose);

    match cli.command {
        Some(Commands::Fetch(args)) => {
            fetch_command(args).await?;
        }
        Some(Commands::Catalog(args)) => {
            catalog_command(args).await?;
        }
        None => {
            let _ = Cli::parse_from(["folio", "--help"]);
        }
    }

    Ok(())
}

#[instrument(skip_all, fields(url = %args.url))]
async fn fetch_command(args: FetchArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.source)
        .await
        .with_context(|| format!("reading source {}", args.source.display()))?;
    let source: BookSource = serde_json::from_str(&raw)?;

    let mut fetch_config = FetchConfig::builder();
    for (name, value) in &source.headers {
        fetch_config = fetch_config.default_header(name, value);
    }
    if let Some(rate) = args.rate {
        fetch_config = fetch_config.requests_per_minute(rate);
    }
    let fetcher = Arc::new(HttpFetcher::new(fetch_config.build())?);

    let storage = StorageConfig::new(&args.output);
    let service = ChapterContentService::builder()
        .fetcher(fetcher.clone())
        .sink(Arc::new(FileContentStore::with_config(storage.clone())))
        .chapter_store(Arc::new(XmlChapterStore::with_config(storage)))
        .config(ContentConfig::builder().concurrency(args.concurrency).build())
        .build()?;

    let book_url = args.book.clone().unwrap_or_else(|| args.url.clone());
    let book = Book {
        origin: source.key.clone(),
        ..Book::new(&book_url, "", "")
    };
    let mut chapter = Chapter::new(&book_url, args.index, &args.url, &args.title);
    chapter.is_volume = args.volume;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let target = FetchTarget::new(&args.url).with_headers(source.headers.clone());
    let first = fetcher.fetch(&target, &cancel).await?;
    let content = service
        .fetch_and_store_content(
            &source,
            &book,
            &chapter,
            first,
            args.next_chapter.as_deref(),
            !args.dry_run,
            &cancel,
        )
        .await
        .map_err(|err| anyhow!("chapter {} failed ({:?}): {}", chapter.index, err.kind(), err))?;

    println!("{content}");
    if !args.dry_run {
        info!(chapter = chapter.index, dir = %args.output.display(), "stored chapter");
    }
    Ok(())
}

#[instrument(skip_all, fields(book = %args.book))]
async fn catalog_command(args: CatalogArgs) -> anyhow::Result<()> {
    let store = XmlChapterStore::with_config(StorageConfig::new(&args.output));
    let entries = store.load_catalog(&args.book).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let contents = FileContentStore::with_config(StorageConfig::new(&args.output));
    for entry in entries {
        let marker = if entry.is_volume { "+" } else { " " };
        let chapter = entry.clone().into_chapter(&args.book);
        let stored = if contents.has_content(&chapter).await? { "stored" } else { "-" };
        println!(
            "{marker}{:>5}  {:<40}  {:<6}  {}",
            entry.index,
            entry.title,
            stored,
            entry.updated_at.to_rfc3339()
        );
        if let Some(image) = &entry.review_image {
            println!("        image: {image}");
        }
    }
    Ok(())
}
