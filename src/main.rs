use anyhow::{bail, Result};
use std::env;
use std::path::Path;

use catalog_sync::{
    store, AvalaraClient, BigCommerceClient, Config, ReconciliationEngine, SyncEngine,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Configuration is validated before any stage does work; a missing
    // variable aborts here with every gap named
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("fetch-avalara") => run_fetch_avalara(&config),
        Some("fetch-products") => run_fetch_products(&config),
        Some("reconcile") => run_reconcile(),
        Some("sync") => run_sync(&config),
        None => run_all(&config),
        Some(other) => {
            print_usage();
            bail!("Unknown stage: {}", other);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: catalog-sync [stage]");
    eprintln!();
    eprintln!("Stages (no argument runs all four in sequence):");
    eprintln!("  fetch-avalara    Pull the Avalara item registry → {}", store::REGISTRY_ITEMS_FILE);
    eprintln!("  fetch-products   Pull visible BigCommerce products → {}", store::CATALOG_PRODUCTS_FILE);
    eprintln!("  reconcile        Diff the two files → {}", store::RECONCILIATION_FILE);
    eprintln!("  sync             Plant marker fields on flagged products → {}", store::SYNC_LOG_FILE);
}

fn run_all(config: &Config) -> Result<()> {
    println!("🔄 Catalog Sync - Full Pipeline");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n[1/4] Avalara registry");
    run_fetch_avalara(config)?;

    println!("\n[2/4] BigCommerce catalog");
    run_fetch_products(config)?;

    println!("\n[3/4] Reconciliation");
    run_reconcile()?;

    println!("\n[4/4] Marker sync");
    run_sync(config)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Pipeline complete");

    Ok(())
}

fn run_fetch_avalara(config: &Config) -> Result<()> {
    println!("🧾 Fetching Avalara item registry...");

    let client = AvalaraClient::new(config)?;
    let items = client.fetch_all_items();
    println!("✓ Fetched {} registry items", items.len());

    store::write_registry_items(Path::new(store::REGISTRY_ITEMS_FILE), &items)?;
    println!("✓ Wrote {}", store::REGISTRY_ITEMS_FILE);

    Ok(())
}

fn run_fetch_products(config: &Config) -> Result<()> {
    println!("🛒 Fetching visible BigCommerce products...");

    let client = BigCommerceClient::new(config)?;
    let products = client.fetch_visible_products();
    println!("✓ Fetched {} products", products.len());

    let (valid, invalid) = catalog_sync::bigcommerce::partition_by_sku(products);
    for product in &invalid {
        println!(
            "⚠️  Skipping product {} ({:?}) - blank SKU",
            product.id, product.name
        );
    }

    store::write_catalog_products(Path::new(store::CATALOG_PRODUCTS_FILE), &valid)?;
    println!(
        "✓ Wrote {} ({} valid, {} skipped)",
        store::CATALOG_PRODUCTS_FILE,
        valid.len(),
        invalid.len()
    );

    Ok(())
}

fn run_reconcile() -> Result<()> {
    println!("⚖️  Reconciling catalog against registry...");

    let items = store::read_registry_items(Path::new(store::REGISTRY_ITEMS_FILE))?;
    let products = store::read_catalog_products(Path::new(store::CATALOG_PRODUCTS_FILE))?;
    println!("✓ Loaded {} items, {} products", items.len(), products.len());

    let engine = ReconciliationEngine::new();
    let (results, summary) = engine.reconcile(&products, &items);

    store::write_reconciliation(Path::new(store::RECONCILIATION_FILE), &results)?;
    println!("✓ Wrote {}", store::RECONCILIATION_FILE);

    println!("\n📊 {}", summary.summary());
    println!("   Not registered:  {}", summary.not_registered);
    println!("   Missing data:    {}", summary.missing_data);
    println!("   Complete:        {}", summary.complete);

    Ok(())
}

fn run_sync(config: &Config) -> Result<()> {
    println!("🔁 Planting marker fields on flagged products...");

    let flagged = store::read_reconciliation(Path::new(store::RECONCILIATION_FILE))?;
    println!("✓ Loaded {} flagged products", flagged.len());

    let client = BigCommerceClient::new(config)?;
    let engine = SyncEngine::new(config.marker_field_name.clone());
    let (log, summary) = engine.run(&flagged, &client);

    store::write_sync_log(Path::new(store::SYNC_LOG_FILE), &log)?;
    println!("✓ Wrote {}", store::SYNC_LOG_FILE);

    println!("\n📊 {}", summary.summary());
    if !summary.error_breakdown.is_empty() {
        println!("   Error breakdown:");
        let mut kinds: Vec<_> = summary.error_breakdown.iter().collect();
        kinds.sort_by(|a, b| a.0.cmp(b.0));
        for (kind, count) in kinds {
            println!("   {:>4} × {}", count, kind);
        }
    }

    Ok(())
}
