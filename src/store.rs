// 💾 Store - CSV persistence for the four inter-stage tables
//
// Each stage writes its output here and the next stage reads it back,
// which is what makes every stage independently re-runnable. Readers
// fail fast when a prerequisite file is missing, naming the stage that
// produces it.

use crate::avalara::RegistryItem;
use crate::bigcommerce::CatalogProduct;
use crate::reconcile::ReconciliationResult;
use crate::sync::SyncLogEntry;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

// ============================================================================
// WELL-KNOWN LOCATIONS
// ============================================================================

pub const REGISTRY_ITEMS_FILE: &str = "data/avalara_items.csv";
pub const CATALOG_PRODUCTS_FILE: &str = "data/bigcommerce_products.csv";
pub const RECONCILIATION_FILE: &str = "data/reconciliation.csv";
pub const SYNC_LOG_FILE: &str = "data/sync_log.csv";

// ============================================================================
// GENERIC CSV I/O
// ============================================================================

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    Ok(())
}

fn read_rows<T: DeserializeOwned>(path: &Path, producing_stage: &str) -> Result<Vec<T>> {
    if !path.exists() {
        bail!(
            "Missing prerequisite file {} - run `catalog-sync {}` first",
            path.display(),
            producing_stage
        );
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: T =
            result.with_context(|| format!("Failed to deserialize row in {}", path.display()))?;
        rows.push(row);
    }

    Ok(rows)
}

// ============================================================================
// PER-TABLE WRAPPERS
// ============================================================================

pub fn write_registry_items(path: &Path, items: &[RegistryItem]) -> Result<()> {
    write_rows(path, items)
}

pub fn read_registry_items(path: &Path) -> Result<Vec<RegistryItem>> {
    read_rows(path, "fetch-avalara")
}

pub fn write_catalog_products(path: &Path, products: &[CatalogProduct]) -> Result<()> {
    write_rows(path, products)
}

pub fn read_catalog_products(path: &Path) -> Result<Vec<CatalogProduct>> {
    read_rows(path, "fetch-products")
}

pub fn write_reconciliation(path: &Path, results: &[ReconciliationResult]) -> Result<()> {
    write_rows(path, results)
}

pub fn read_reconciliation(path: &Path) -> Result<Vec<ReconciliationResult>> {
    read_rows(path, "reconcile")
}

pub fn write_sync_log(path: &Path, entries: &[SyncLogEntry]) -> Result<()> {
    write_rows(path, entries)
}

// ============================================================================
// TESTS
// ============================================================================
