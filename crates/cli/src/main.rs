use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shopfront_api::{Storefront, StorefrontOpts};
use shopfront_app::{init_metrics, init_tracing, open_store};
use shopfront_auth::{Claims, HmacVerifier, StaticVerifier};
use shopfront_core::{ListingPage, ListingQuery, Product, SortField, SortOrder, DEFAULT_PAGE_SIZE};
use shopfront_persist::SqliteStore;
use shopfront_search::{SearchOpts, DEFAULT_THRESHOLD};
use shopfront_store::load_seed;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shopfrontctl", version, about = "Shopfront CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// JSON seed documents (in-memory store)
    #[arg(long, env = "SHOPFRONT_SEED", global = true)]
    seed: Option<PathBuf>,

    /// SQLite database (takes precedence over --seed)
    #[arg(long = "db", env = "SHOPFRONT_DB_PATH", global = true)]
    db: Option<PathBuf>,

    /// Search looseness cut-off
    #[arg(long, env = "SHOPFRONT_SEARCH_THRESHOLD", global = true, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a listing query (filter, sort, search, paginate)
    Ls {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
        /// id, title, price, rating, stock or category
        #[arg(long = "sort-by", default_value = "id")]
        sort_by: SortField,
        /// asc or desc
        #[arg(long, default_value = "asc")]
        order: SortOrder,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
        /// Print per-stage counts
        #[arg(long = "explain", action = ArgAction::SetTrue)]
        explain: bool,
    },
    /// Show one product with its reviews
    Show {
        /// Product id; short ids are zero-padded ("7" -> "007")
        id: String,
    },
    /// List distinct categories
    Categories,
    /// Import seed documents into the SQLite database given by --db
    Import {
        file: PathBuf,
    },
    /// Bearer token helpers
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommands {
    /// Mint an HMAC-signed bearer token
    Mint {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "ttl-secs", default_value_t = 3600)]
        ttl_secs: i64,
        #[arg(long, env = "SHOPFRONT_AUTH_SECRET", hide_env_values = true)]
        secret: String,
    },
}

fn storefront(cli: &Cli) -> Result<Storefront> {
    let store = open_store(cli.seed.as_deref(), cli.db.as_deref())?;
    let opts = StorefrontOpts { search: SearchOpts { threshold: cli.threshold }, ..Default::default() };
    // read-only commands never authenticate
    Ok(Storefront::new(store, Arc::new(StaticVerifier::empty())).with_opts(opts))
}

fn print_json<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn print_page(page: &ListingPage) {
    println!("{:<6} {:>9} {:>6} {:>6}  {:<14} TITLE", "ID", "PRICE", "RATING", "STOCK", "CATEGORY");
    for p in page.products.iter() {
        println!("{:<6} {:>9.2} {:>6.2} {:>6}  {:<14} {}", p.id, p.price, p.rating, p.stock, p.category, p.title);
    }
    let more = if page.has_more { " • more" } else { "" };
    println!("page {}/{} • {} products{}", page.page, page.total_pages, page.total_products, more);
}

fn print_product(p: &Product) {
    println!("{} • {}", p.id, p.title);
    println!("category: {}  price: {:.2}  rating: {:.2}  stock: {}", p.category, p.price, p.rating, p.stock);
    if !p.tags.is_empty() { println!("tags: {}", p.tags.join(", ")); }
    if !p.description.is_empty() { println!("{}", p.description); }
    if p.reviews.is_empty() {
        println!("reviews: (none)");
        return;
    }
    println!("reviews:");
    for r in p.reviews.iter() {
        println!("  {} {}/5 {} <{}> {}", r.date, r.rating, r.reviewer_name, r.reviewer_email, r.comment);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Ls { page, limit, sort_by, order, category, search, explain } => {
            let shop = storefront(&cli)?;
            let q = ListingQuery {
                page: (*page).max(1),
                page_size: (*limit).max(1),
                sort_by: *sort_by,
                order: *order,
                category: category.clone(),
                search: search.clone(),
            };
            let (page, dbg) = shop.list_products_explain(&q).await?;
            match cli.output {
                Output::Human => print_page(&page),
                Output::Json if *explain => {
                    #[derive(Serialize)]
                    struct Explain<'a> { page: &'a ListingPage, explain: &'a shopfront_api::ListingExplain }
                    print_json(&Explain { page: &page, explain: &dbg })?;
                }
                Output::Json => print_json(&page)?,
            }
            if *explain && matches!(cli.output, Output::Human) {
                let (total, matched) = dbg.search.map(|s| (s.total, s.matched)).unwrap_or((dbg.filtered, dbg.filtered));
                eprintln!("debug: filtered={} searched={}/{} returned={} took_ms={}", dbg.filtered, matched, total, page.products.len(), dbg.took_ms);
            }
        }
        Commands::Show { id } => {
            let shop = storefront(&cli)?;
            let product = shop.product(id).await?;
            match cli.output {
                Output::Human => print_product(&product),
                Output::Json => print_json(&product)?,
            }
        }
        Commands::Categories => {
            let shop = storefront(&cli)?;
            let cats = shop.categories().await?;
            match cli.output {
                Output::Human => cats.iter().for_each(|c| println!("{c}")),
                Output::Json => print_json(&cats)?,
            }
        }
        Commands::Import { file } => {
            let db = cli.db.as_deref().context("import needs --db (or SHOPFRONT_DB_PATH)")?;
            let store = SqliteStore::open(db)?;
            let n = store.import(load_seed(file)?).context("importing documents")?;
            info!(products = n, db = %db.display(), "import ok");
            match cli.output {
                Output::Human => println!("imported {} products into {}", n, db.display()),
                Output::Json => print_json(&serde_json::json!({ "imported": n, "db": db.display().to_string() }))?,
            }
        }
        Commands::Token { command: TokenCommands::Mint { email, name, ttl_secs, secret } } => {
            let claims = Claims::new(email.clone(), name.clone(), chrono::Duration::seconds(*ttl_secs));
            let token = HmacVerifier::new(secret.as_str()).mint(&claims)?;
            match cli.output {
                Output::Human => println!("{token}"),
                Output::Json => print_json(&serde_json::json!({ "token": token, "exp": claims.exp }))?,
            }
        }
    }
    Ok(())
}
