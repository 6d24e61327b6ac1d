use anyhow::{Context, Result};
use carvise::api::{self, ServeConfig, DEFAULT_BIND, DEFAULT_DATASET_PATH, DEFAULT_MODEL_PATH};
use carvise::dataset::{load_dataset, write_dataset};
use carvise::features::current_year;
use carvise::present::{self, AskConfig, DEFAULT_API_URL};
use carvise::pricing::{train, TrainConfig};
use carvise::recommender::Recommender;
use carvise::scrapers::types::DEFAULT_INDEX_URL;
use carvise::scrapers::{
    collect_listings, AutoTraderBrowserScraper, HttpListingSource, ListingSource, ScrapeConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "carvise", about = "Used-car price model and budget recommender")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    /// Headless Chrome, for pages rendered by JavaScript
    Browser,
    /// Plain HTTP requests
    Http,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect listings and write the dataset CSV
    Scrape {
        #[arg(long, env = "CARVISE_INDEX_URL", default_value = DEFAULT_INDEX_URL)]
        index_url: String,
        /// Max listings to visit
        #[arg(short = 'n', long, env = "CARVISE_MAX_LISTINGS", default_value_t = 100)]
        limit: usize,
        #[arg(long, value_enum, default_value = "browser")]
        source: Source,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Seconds to wait for a page element
        #[arg(long, default_value_t = 15)]
        wait_secs: u64,
        /// Directory for the rendered index page
        #[arg(long)]
        debug_dir: Option<PathBuf>,
        #[arg(short, long, env = "CARVISE_DATASET", default_value = DEFAULT_DATASET_PATH)]
        output: PathBuf,
    },
    /// Train the price model from the dataset CSV
    Train {
        #[arg(short, long, env = "CARVISE_DATASET", default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        #[arg(short, long, env = "CARVISE_MODEL", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        #[arg(long, default_value_t = 200)]
        trees: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Fewest valid rows to train on
        #[arg(long, default_value_t = 100)]
        min_rows: usize,
    },
    /// Serve recommendations over HTTP
    Serve {
        #[arg(long, env = "CARVISE_BIND", default_value = DEFAULT_BIND)]
        bind: String,
        #[arg(short, long, env = "CARVISE_DATASET", default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        #[arg(short, long, env = "CARVISE_MODEL", default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
    },
    /// Ask a running server for cars and print them
    Ask {
        #[arg(short, long)]
        budget: f64,
        #[arg(short, long, default_value_t = 5)]
        seats: u32,
        #[arg(long, env = "CARVISE_API_URL", default_value = DEFAULT_API_URL)]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            index_url,
            limit,
            source,
            headed,
            wait_secs,
            debug_dir,
            output,
        } => {
            let config = ScrapeConfig {
                index_url,
                max_listings: limit,
                headless: !headed,
                wait_timeout: Duration::from_secs(wait_secs),
                debug_dir,
                ..ScrapeConfig::default()
            };
            scrape(config, source, &output).await
        }
        Commands::Train {
            dataset,
            model,
            trees,
            seed,
            min_rows,
        } => {
            let mut config = TrainConfig {
                min_rows,
                split_seed: seed,
                ..TrainConfig::default()
            };
            config.forest.n_trees = trees;
            config.forest.seed = seed;
            train_model(&config, &dataset, &model)
        }
        Commands::Serve {
            bind,
            dataset,
            model,
        } => {
            let config = ServeConfig {
                bind,
                model_path: model,
                dataset_path: dataset,
            };
            let recommender =
                Recommender::load(&config.model_path, &config.dataset_path, current_year())?;
            api::serve(&config, recommender).await
        }
        Commands::Ask {
            budget,
            seats,
            api_url,
        } => {
            let config = AskConfig {
                api_url,
                budget,
                seats,
                ..AskConfig::default()
            };
            let answer = present::fetch(&config).await?;
            print!("{}", present::render(&answer));
            Ok(())
        }
    }
}

async fn scrape(config: ScrapeConfig, source: Source, output: &Path) -> Result<()> {
    info!("🚗 Carvise - Listing Collector");
    info!("==============================");

    let source: Box<dyn ListingSource> = match source {
        Source::Browser => Box::new(AutoTraderBrowserScraper::new(config.clone())?),
        Source::Http => Box::new(HttpListingSource::new(config.clone())?),
    };

    let report = collect_listings(source.as_ref(), &config).await?;

    info!(
        "✅ Scraped {} of {} listings ({} skipped)",
        report.listings.len(),
        report.found_urls,
        report.skipped.len()
    );
    if report.suspect_mileage() > 0 {
        warn!("{} listings had unreadable mileage", report.suspect_mileage());
    }
    for skipped in &report.skipped {
        println!("   skipped [{}] {}: {}", skipped.reason, skipped.url, skipped.message);
    }

    if report.listings.is_empty() {
        warn!("No listings collected, dataset not written");
        return Ok(());
    }
    write_dataset(output, &report.listings)
}

fn train_model(config: &TrainConfig, dataset_path: &Path, model_path: &Path) -> Result<()> {
    let dataset = load_dataset(dataset_path)?;
    let (model, report) = train(&dataset, config, current_year())
        .with_context(|| format!("Training on {} failed", dataset_path.display()))?;

    println!("Rows: {} loaded, {} valid", report.rows_loaded, report.rows_valid);
    println!(
        "Split: {} train / {} test{}",
        report.train_rows,
        report.test_rows,
        if report.stratified { " (stratified by year)" } else { "" }
    );
    println!("Features: {}", report.features);
    println!("MAE: ${:.2}", report.mae);
    println!("R²: {:.3}", report.r2);
    println!("Top features:");
    for (name, score) in &report.top_features {
        println!("   {:<30} {:.2}", name, score);
    }

    model.save(model_path)
}
