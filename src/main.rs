use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rental_scout::config::{load_app_config, AppConfig, Backend};
use rental_scout::models::{GeoPoint, Item, ItemCategory, PriceRange, SearchFilters, SortOption};
use rental_scout::search::{item_fields, ItemQueryService, ITEMS};
use rental_scout::store::{DocumentStore, FirestoreStore, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rental-scout", about = "Browse rental listings in Davao del Sur")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search listings with filters
    Search {
        #[arg(long)]
        category: Option<ItemCategory>,
        #[arg(long)]
        subcategory: Option<String>,
        #[arg(long)]
        available: Option<bool>,
        #[arg(long, requires = "max_price")]
        min_price: Option<f64>,
        #[arg(long, requires = "min_price")]
        max_price: Option<f64>,
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Kilometers around --lat/--lon
        #[arg(long)]
        radius: Option<f64>,
        /// price_low_to_high, price_high_to_low, rating, distance, newest, oldest, popularity
        #[arg(long)]
        sort: Option<SortOption>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long, default_value = "search_results.json")]
        output: PathBuf,
    },
    /// Show one listing and count the view
    View { item_id: String },
    /// List everything a lessor has posted
    Lessor { lessor_id: String },
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        Backend::Firestore => {
            let firestore = config
                .firestore
                .as_ref()
                .context("Firestore backend selected without Firestore settings")?;
            let store = FirestoreStore::new(firestore, config.http_timeout)
                .context("Failed to create Firestore client")?;
            Ok(Arc::new(store))
        }
        Backend::Memory => {
            let store = MemoryStore::new();
            match &config.seed_file {
                Some(path) => seed_memory_store(&store, path)?,
                None => warn!("No RENTAL_SEED_FILE set, memory store starts empty"),
            }
            Ok(Arc::new(store))
        }
    }
}

fn seed_memory_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let items: Vec<Item> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

    for item in &items {
        store.insert(ITEMS, &item.id, item_fields(item)?)?;
    }

    info!("Seeded memory store with {} items", items.len());
    Ok(())
}

fn print_item(index: usize, item: &Item) {
    println!(
        "{}. {} ({} PHP {})",
        index + 1,
        item.title,
        item.price,
        item.price_type.as_str()
    );
    println!("   {} · {}, {}", item.category, item.city, item.province);
    if let Some(distance) = item.distance_km {
        println!("   {:.1} km away", distance);
    }
    println!(
        "   Available: {}  Rating: {:.1}  Views: {}",
        item.is_available, item.rating, item.view_count
    );
    println!("   ID: {}", item.id);
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_app_config().context("Failed to load configuration")?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = build_store(&config)?;
    info!("Using {} document store", store.backend_name());
    let service = ItemQueryService::new(store);

    match cli.command {
        Command::Search {
            category,
            subcategory,
            available,
            min_price,
            max_price,
            lat,
            lon,
            radius,
            sort,
            page,
            page_size,
            output,
        } => {
            let origin = lat.zip(lon).map(|(lat, lon)| GeoPoint::new(lat, lon));
            let filters = SearchFilters {
                category,
                subcategory,
                availability: available,
                price_range: min_price
                    .zip(max_price)
                    .map(|(min, max)| PriceRange { min, max }),
                location: None,
                radius,
                sort_by: sort,
            };
            let page_size = page_size.unwrap_or(config.default_page_size);

            let results = service
                .search(&filters, origin, page, page_size)
                .await
                .context("Search failed")?;

            info!("Found {} items on page {}", results.total, page);
            for (i, item) in results.items.iter().enumerate() {
                print_item(i, item);
            }

            let json = serde_json::to_string_pretty(&results)?;
            tokio::fs::write(&output, json).await?;
            info!("Saved results to {}", output.display());
        }
        Command::View { item_id } => {
            match service.get_item(&item_id).await.context("Failed to get item")? {
                Some(item) => {
                    print_item(0, &item);
                    println!("{}", item.description);
                    service.increment_view_count(&item_id).await;
                }
                None => warn!("Item {} not found", item_id),
            }
        }
        Command::Lessor { lessor_id } => {
            let items = service
                .items_by_lessor(&lessor_id)
                .await
                .context("Failed to list lessor items")?;
            info!("Lessor {} has {} items", lessor_id, items.len());
            for (i, item) in items.iter().enumerate() {
                print_item(i, item);
            }
        }
    }

    Ok(())
}
