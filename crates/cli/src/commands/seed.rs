//! Seed the catalog with products from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Widget
//!     sku: WIDGET-1
//!     description: Standard widget
//!     price: "9.99"
//!     quantity: 25
//! ```
//!
//! Products whose SKU already belongs to an active product are skipped, so
//! the command can be re-run against the same file.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use stockroom_api::config;
use stockroom_api::db::{self, PgProductStore};
use stockroom_api::services::catalog::{CatalogError, CatalogService, ProductInput};

/// Top-level shape of a seed file.
#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<ProductInput>,
}

/// Outcome of a seeding run.
#[derive(Debug, Default)]
struct SeedSummary {
    inserted: usize,
    skipped: usize,
    errors: Vec<(String, CatalogError)>,
}

/// Seed products from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the database
/// is unreachable. Individual product failures are reported and counted, not
/// returned.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Parse before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(products = seed.products.len(), "Parsed seed file");

    let database_url = config::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let store = PgProductStore::new(pool.clone());
    let catalog = CatalogService::new(&store);
    let mut summary = SeedSummary::default();

    for input in seed.products {
        let sku = input.sku.clone();
        match catalog.get_by_sku(&sku).await {
            Ok(_) => {
                summary.skipped += 1;
                continue;
            }
            Err(CatalogError::NotFound) => {}
            Err(e) => {
                summary.errors.push((sku, e));
                continue;
            }
        }

        match catalog.create(input).await {
            Ok(product) => {
                info!(id = %product.id, sku = %product.sku, "Created product");
                summary.inserted += 1;
            }
            Err(CatalogError::DuplicateSku(_)) => summary.skipped += 1,
            Err(e) => summary.errors.push((sku, e)),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {}", summary.inserted);
    info!("  Products skipped (already exist): {}", summary.skipped);

    if !summary.errors.is_empty() {
        warn!("  Errors: {}", summary.errors.len());
        for (sku, err) in &summary.errors {
            error!("    - {sku}: {err}");
        }
    }

    pool.close().await;
    Ok(())
}
