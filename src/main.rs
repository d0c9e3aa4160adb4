// Copyright 2026 Forage Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use forage::answer::{AnswerClient, Inferential, StrictContext};
use forage::config::{Settings, SiteProfile};
use forage::discovery::brands::{self, HoverTiming};
use forage::discovery::listings;
use forage::dom::JsDom;
use forage::harvest::{self, HarvestStore};
use forage::ingest::{self, IngestClient};
use forage::interact::{self, Timing};
use forage::pagination::ExpansionBudget;
use forage::session::{find_chromium, BrowserOptions, ChromiumSession, PageContext};

#[derive(Parser)]
#[command(
    name = "forage",
    about = "Forage — harvest a rendered marketing site into retrieval-ready records",
    version,
    after_help = "Run 'forage <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover brand and product URLs through the hover menu
    DiscoverBrands {
        /// Run the browser with a visible window
        #[arg(long)]
        headful: bool,
    },
    /// Discover recipe and article URLs from the listing pages
    DiscoverListings {
        /// Run the browser with a visible window
        #[arg(long)]
        headful: bool,
    },
    /// Extract every discovered URL into harvest records
    Harvest {
        /// Run the browser with a visible window
        #[arg(long)]
        headful: bool,
    },
    /// Upsert harvest records into the embedding index
    Ingest,
    /// Ask a question against the indexed corpus
    Ask {
        /// The question to answer
        question: String,
        /// Allow synthesis across context entries instead of strict
        /// context-only answers
        #[arg(long)]
        inferential: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "forage=debug"
    } else if quiet {
        "forage=error"
    } else {
        "forage=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn browser_options(headful: bool) -> BrowserOptions {
    BrowserOptions {
        headless: !headful,
        ..BrowserOptions::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::DiscoverBrands { headful } => discover_brands(headful).await,
        Commands::DiscoverListings { headful } => discover_listings(headful).await,
        Commands::Harvest { headful } => run_harvest(headful).await,
        Commands::Ingest => run_ingest().await,
        Commands::Ask {
            question,
            inferential,
        } => run_ask(&question, inferential).await,
        Commands::Doctor => run_doctor(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "forage", &mut std::io::stdout());
            Ok(())
        }
    }
}

async fn discover_brands(headful: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let origin = harvest::site_origin(&settings)?;
    let profile = SiteProfile::default_site();
    let store = HarvestStore::new(&settings.data_dir);
    let budget = ExpansionBudget::default();

    let mut session = ChromiumSession::launch(&browser_options(headful)).await?;
    session
        .navigate(&settings.base_url, settings.nav_timeout_ms)
        .await?;

    let brand_links = {
        let dom = JsDom::new(&session);
        interact::dismiss_overlays(&dom, &profile.overlays, &Timing::default()).await;
        brands::collect_brand_links(&dom, &profile.menu, &origin, &HoverTiming::default()).await?
    };
    info!(brands = brand_links.len(), "brand discovery complete");

    let mut all = Vec::with_capacity(brand_links.len());
    for brand in &brand_links {
        match brands::collect_brand_products(
            &mut session,
            &profile,
            &origin,
            &brand.url,
            settings.nav_timeout_ms,
            &budget,
        )
        .await
        {
            Ok(products) => all.push(products),
            Err(e) => warn!(brand = %brand.url, "product discovery failed, skipping: {e}"),
        }
    }
    session.close().await;

    store.save_brand_products(&all)?;
    println!(
        "Saved {} brand product sets to {}",
        all.len(),
        store.brand_products_path().display()
    );
    Ok(())
}

async fn discover_listings(headful: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let origin = harvest::site_origin(&settings)?;
    let profile = SiteProfile::default_site();
    let store = HarvestStore::new(&settings.data_dir);

    let recipes_url = format!(
        "{}{}",
        settings.base_url.trim_end_matches('/'),
        settings.recipes_path
    );
    let articles_url = format!(
        "{}{}",
        settings.base_url.trim_end_matches('/'),
        settings.articles_path
    );

    let mut session = ChromiumSession::launch(&browser_options(headful)).await?;
    let urls = listings::collect_listing_urls(
        &mut session,
        &profile,
        &origin,
        &recipes_url,
        &articles_url,
        settings.nav_timeout_ms,
        &ExpansionBudget::default(),
    )
    .await?;
    session.close().await;

    store.save_listing_urls(&urls)?;
    println!(
        "Saved {} recipes and {} articles to {}",
        urls.recipes.len(),
        urls.articles.len(),
        store.listing_urls_path().display()
    );
    Ok(())
}

async fn run_harvest(headful: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let profile = SiteProfile::default_site();
    let store = HarvestStore::new(&settings.data_dir);

    let brands = store
        .load_brand_products()
        .context("no brand discovery output — run 'forage discover-brands' first")?;
    let listings = store
        .load_listing_urls()
        .context("no listing discovery output — run 'forage discover-listings' first")?;
    let products = harvest::dedupe_products(&brands);
    info!(
        products = products.len(),
        recipes = listings.recipes.len(),
        articles = listings.articles.len(),
        "harvest plan loaded"
    );

    let mut session = ChromiumSession::launch(&browser_options(headful)).await?;
    let records =
        harvest::harvest_all(&mut session, &profile, &settings, &products, &listings).await;
    session.close().await;

    store.save_records(&records)?;
    println!(
        "Saved {} records to {}",
        records.len(),
        store.records_path().display()
    );
    Ok(())
}

async fn run_ingest() -> Result<()> {
    let settings = Settings::from_env()?;
    let store = HarvestStore::new(&settings.data_dir);
    let records = store
        .load_records()
        .context("no harvest output — run 'forage harvest' first")?;

    let index_url = settings
        .index_url
        .context("FORAGE_INDEX_URL is not set")?;
    let client = IngestClient::new(
        format!("{}/records/upsert", index_url.trim_end_matches('/')),
        settings.index_api_key,
        settings.index_namespace,
        settings.batch_size,
    )?;

    let prepared = ingest::prepare_records(&records);
    info!(
        total = records.len(),
        embeddable = prepared.len(),
        "prepared ingest records"
    );
    let sent = client.upsert_all(&prepared).await?;
    println!("Upserted {sent} records");
    Ok(())
}

async fn run_ask(question: &str, inferential: bool) -> Result<()> {
    let settings = Settings::from_env()?;
    let index_url = settings
        .index_url
        .context("FORAGE_INDEX_URL is not set")?;
    let llm_url = settings.llm_url.context("FORAGE_LLM_URL is not set")?;

    let policy: Box<dyn forage::answer::AnswerPolicy> = if inferential {
        Box::new(Inferential)
    } else {
        Box::new(StrictContext)
    };
    let client = AnswerClient::new(
        format!("{}/records/search", index_url.trim_end_matches('/')),
        settings.index_api_key,
        llm_url,
        settings.llm_api_key,
        settings.llm_model,
        settings.index_namespace,
        settings.top_k,
        settings.site_name,
        policy,
    )?;

    let answer = client.ask(question).await?;
    println!("{}", answer.answer);
    Ok(())
}

fn run_doctor() -> Result<()> {
    println!("forage doctor");

    match find_chromium() {
        Some(path) => println!("  chromium:        {}", path.display()),
        None => println!("  chromium:        NOT FOUND (set FORAGE_CHROMIUM_PATH)"),
    }

    let check = |name: &str| match std::env::var(name) {
        Ok(v) if !v.is_empty() => println!("  {name}: set ({} chars)", v.len()),
        _ => println!("  {name}: not set"),
    };
    check("FORAGE_BASE_URL");
    check("FORAGE_DATA_DIR");
    check("FORAGE_INDEX_URL");
    check("FORAGE_INDEX_API_KEY");
    check("FORAGE_LLM_URL");
    check("FORAGE_LLM_API_KEY");

    Ok(())
}
