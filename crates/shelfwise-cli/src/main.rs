use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use shelfwise_core::{
    AppConfig, BookId, BookRecord, BookView, CategoryId, CategoryNode, CategoryRepository,
    Comparison, Database, ExitCode, FileSource, ImportOutcome, LocalFileSource, ShelfError,
    TieredMatcher, import_candidates, merge_by_title, parse_candidates, viewer,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "shelfwise",
    about = "Personal e-book catalog with duplicate-aware import and collection matching",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting SHELFWISE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level regardless of RUST_LOG and config.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the book files found in a directory.
    Import {
        dir: PathBuf,
        /// Only look at files directly inside the directory.
        #[arg(long)]
        no_recursive: bool,
    },

    /// Compare the books in two directories without importing them.
    Compare { left: PathBuf, right: PathBuf },

    /// List books in the catalog.
    List {
        /// all, new, incomplete, favorites or recent.
        #[arg(long, default_value = "all")]
        view: BookView,
        /// Collapse format variants of the same title into one entry.
        #[arg(long)]
        merged: bool,
    },

    /// Search title, author and description.
    Search {
        query: String,
        #[arg(long)]
        merged: bool,
    },

    /// Operations on a single book.
    Book {
        #[command(subcommand)]
        action: BookAction,
    },

    /// Category management.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ─── Book Actions ───────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum BookAction {
    /// Show a book record.
    Get { id: BookId },
    /// Toggle the favorite flag.
    Favorite { id: BookId },
    /// Open the book file in the system viewer.
    Open {
        id: BookId,
        /// Application to open the file with instead of the default.
        #[arg(long)]
        with: Option<String>,
    },
    /// Remove a book from the catalog (the file stays on disk).
    Delete { id: BookId },
}

// ─── Category Actions ───────────────────────────────────────────────────────

#[derive(Subcommand)]
enum CategoryAction {
    /// Show the category tree.
    List,
    /// Create a category.
    Create {
        name: String,
        #[arg(long)]
        parent: Option<CategoryId>,
    },
    /// Rename a category.
    Rename { id: CategoryId, name: String },
    /// Delete a category without subcategories.
    Delete { id: CategoryId },
    /// Replace the books held by a category.
    Assign {
        id: CategoryId,
        book_ids: Vec<BookId>,
    },
    /// List the books held by a category.
    Books {
        id: CategoryId,
        #[arg(long)]
        merged: bool,
    },
}

// ─── Config Actions ─────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective config.
    Show,
    /// Print the config file location.
    Path,
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    let json_output = cli.json || std::env::var("SHELFWISE_JSON").as_deref() == Ok("1");

    let config = AppConfig::load();
    let level = config.as_ref().map(|c| c.log.level.as_str()).unwrap_or("info");
    init_tracing(cli.verbose, level);

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli.command, config, json_output));

    if let Err(err) = result {
        let code = err
            .downcast_ref::<ShelfError>()
            .map(ShelfError::exit_code)
            .unwrap_or(ExitCode::GeneralError);

        if json_output {
            let _ = print_json(&serde_json::json!({
                "status": "error",
                "error": error_kind(code),
                "message": err.to_string(),
            }));
        } else {
            eprintln!("Error: {err:#}");
        }
        std::process::exit(code as i32);
    }
}

fn init_tracing(verbose: bool, config_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, mut config: AppConfig, json_output: bool) -> Result<()> {
    let start = Instant::now();

    if let Ok(lib_path) = std::env::var("SHELFWISE_LIBRARY_PATH") {
        config.set_library_path(lib_path.into());
    }

    match command {
        Commands::Import { dir, no_recursive } => {
            let recursive = config.import.recursive && !no_recursive;
            let paths = list_book_paths(&dir, recursive)?;
            let db = open_db(&config)?;
            let outcome = import_candidates(&db.books(), &paths)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": outcome,
                    "meta": { "duration_ms": dur, "candidates": paths.len() }
                }))?;
            } else {
                print_import_outcome(&outcome);
            }
        }

        Commands::Compare { left, right } => {
            let fs = LocalFileSource;
            let recursive = config.import.recursive;
            let left_records = parse_candidates(&fs, &list_book_paths(&left, recursive)?);
            let right_records = parse_candidates(&fs, &list_book_paths(&right, recursive)?);

            let matcher = TieredMatcher::new()
                .with_similarity_threshold(config.matching.similarity_threshold);
            let comparison = matcher.compare(&left_records, &right_records);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "counts": comparison.counts, "buckets": comparison.buckets() },
                    "meta": { "duration_ms": dur, "threshold": matcher.similarity_threshold() }
                }))?;
            } else {
                print_comparison(&comparison);
            }
        }

        Commands::List { view, merged } => {
            let db = open_db(&config)?;
            let books = maybe_merge(db.list_books(view)?, merged);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": books, "total": books.len(), "view": view },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if books.is_empty() {
                println!("No books in view '{view}'. Use `shelfwise import <dir>` to add books.");
            } else {
                print_books(&books);
            }
        }

        Commands::Search { query, merged } => {
            let db = open_db(&config)?;
            let results = maybe_merge(db.search_books(&query)?, merged);
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": results, "total": results.len(), "query": query },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if results.is_empty() {
                println!("No results for: {query}");
            } else {
                println!("Found {} results:", results.len());
                print_books(&results);
            }
        }

        Commands::Book { action } => run_book(action, &config, json_output, start)?,
        Commands::Category { action } => run_category(action, &config, json_output, start)?,

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::json!({ "status": "ok", "data": config }))?;
                } else {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                if json_output {
                    print_json(&serde_json::json!({
                        "status": "ok",
                        "data": { "config": path, "database": config.database_path() }
                    }))?;
                } else {
                    println!("{}", path.display());
                }
            }
        },
    }

    Ok(())
}

fn run_book(
    action: BookAction,
    config: &AppConfig,
    json_output: bool,
    start: Instant,
) -> Result<()> {
    let db = open_db(config)?;

    match action {
        BookAction::Get { id } => {
            let book = db.get_book(id)?;
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": book,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("{}", serde_json::to_string_pretty(&book)?);
            }
        }

        BookAction::Favorite { id } => {
            let mut book = db.get_book(id)?;
            book.is_favorite = !book.is_favorite;
            db.update_book(&book)?;
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "id": id, "is_favorite": book.is_favorite },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if book.is_favorite {
                println!("Added to favorites: {}", book.title);
            } else {
                println!("Removed from favorites: {}", book.title);
            }
        }

        BookAction::Open { id, with } => {
            let mut book = db.get_book(id)?;
            match with.as_deref() {
                Some(app) => viewer::open_record_with(&book, app)?,
                None => viewer::open_record(&book)?,
            }
            book.mark_opened();
            db.update_book(&book)?;
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "id": id, "opened": book.file_path },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Opened: {}", book.file_path);
            }
        }

        BookAction::Delete { id } => {
            db.delete_book(id)?;
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "deleted": id },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("Deleted book: #{id}");
            }
        }
    }

    Ok(())
}

fn run_category(
    action: CategoryAction,
    config: &AppConfig,
    json_output: bool,
    start: Instant,
) -> Result<()> {
    let db = open_db(config)?;

    match action {
        CategoryAction::List => {
            let forest = {
                let repo = db.categories();
                repo.get_or_create_default()?;
                CategoryNode::build_forest(&repo.list_all()?)
            };
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": forest,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                for node in &forest {
                    print_category_node(node, 0);
                }
            }
        }

        CategoryAction::Create { name, parent } => {
            let category = db.categories().create(&name, parent)?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":category}))?;
            } else {
                println!("Created category #{}: {}", category.id, category.name);
            }
        }

        CategoryAction::Rename { id, name } => {
            let category = db
                .categories()
                .rename(id, &name)?
                .ok_or_else(|| ShelfError::CategoryNotFound(id.to_string()))?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":category}))?;
            } else {
                println!("Renamed category #{}: {}", category.id, category.name);
            }
        }

        CategoryAction::Delete { id } => {
            db.delete_category(id)?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":{"deleted":id}}))?;
            } else {
                println!("Deleted category: #{id}");
            }
        }

        CategoryAction::Assign { id, book_ids } => {
            let category = db.categories().assign_books(id, &book_ids)?;
            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":category}))?;
            } else {
                println!(
                    "Category '{}' now holds {} books",
                    category.name,
                    category.book_ids.len()
                );
            }
        }

        CategoryAction::Books { id, merged } => {
            let books = maybe_merge(db.books_in_category(id)?, merged);
            let dur = start.elapsed().as_millis();
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": books, "total": books.len(), "category": id },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if books.is_empty() {
                println!("Category #{id} holds no books.");
            } else {
                print_books(&books);
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn open_db(config: &AppConfig) -> Result<Database> {
    let db_path = config.database_path();
    debug!("using catalog {}", db_path.display());
    Ok(Database::open(&db_path)?)
}

fn list_book_paths(dir: &Path, recursive: bool) -> Result<Vec<String>> {
    let files = LocalFileSource.list_files(dir, recursive)?;
    Ok(files
        .into_iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect())
}

fn maybe_merge(books: Vec<BookRecord>, merged: bool) -> Vec<BookRecord> {
    if merged { merge_by_title(&books) } else { books }
}

fn error_kind(code: ExitCode) -> &'static str {
    match code {
        ExitCode::NotFound => "not_found",
        ExitCode::InvalidArgs => "invalid_args",
        ExitCode::Conflict => "conflict",
        ExitCode::Success | ExitCode::GeneralError => "error",
    }
}

fn print_books(books: &[BookRecord]) {
    for book in books {
        let id = book.id.map(|id| format!("#{id}")).unwrap_or_default();
        let mut flags = String::new();
        if book.is_favorite {
            flags.push('*');
        }
        if book.is_new {
            flags.push('+');
        }
        if book.is_info_incomplete {
            flags.push('?');
        }
        println!(
            "{id:>6}  {title:<40}  {author:<25}  {exts:<18}  {flags}",
            title = book.title,
            author = book.author_or_empty(),
            exts = book.file_extensions.join(" "),
        );
    }
}

fn print_import_outcome(outcome: &ImportOutcome) {
    println!("Imported:    {}", outcome.imported.len());
    println!("Duplicates:  {}", outcome.duplicates.len());
    println!("Unsupported: {}", outcome.unsupported.len());
    println!("Failed:      {}", outcome.failed.len());
    for failure in &outcome.failed {
        eprintln!("  {}: {}", failure.path, failure.reason);
    }
}

fn print_comparison(comparison: &Comparison<'_>) {
    for bucket in comparison.buckets() {
        println!("{} ({})", bucket.tier, bucket.count());
        for pair in &bucket.pairs {
            let left = pair.left.map(describe).unwrap_or_default();
            let right = pair.right.map(describe).unwrap_or_default();
            println!("  {left:<45}  {right}");
        }
    }

    let counts = &comparison.counts;
    println!(
        "\nLeft: {} books, right: {} books, matched pairs: {}",
        counts.left_total,
        counts.right_total,
        counts.exact + counts.title_only + counts.author_only + counts.similar_title,
    );
}

fn describe(record: &BookRecord) -> String {
    match record.author.as_deref() {
        Some(author) => format!("{} - {author}", record.title),
        None => record.title.clone(),
    }
}

fn print_category_node(node: &CategoryNode, depth: usize) {
    println!(
        "{indent}#{id} {name} ({count} books)",
        indent = "  ".repeat(depth),
        id = node.category.id,
        name = node.category.name,
        count = node.category.book_ids.len(),
    );
    for child in &node.children {
        print_category_node(child, depth + 1);
    }
}
