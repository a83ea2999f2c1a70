// ⚖️ Reconciliation Engine - Diff the catalog against the item registry
//
// For every catalog product, decide one of three outcomes:
//   - not registered in Avalara at all
//   - registered but missing required tax attributes (group/category)
//   - complete (dropped from the output entirely)
//
// Matching is by SKU vs item code, case-insensitive and trimmed.

use crate::avalara::RegistryItem;
use crate::bigcommerce::CatalogProduct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

/// One flagged product. Field names match the reconciliation CSV columns;
/// complete products are never represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub product_id: u64,
    pub sku: String,
    pub name: String,
    pub exists_in_avalara: bool,
    pub is_missing_data: bool,

    /// Which required attributes are blank ("group", "category");
    /// stored comma-joined in the CSV cell
    #[serde(
        serialize_with = "join_missing_fields",
        deserialize_with = "split_missing_fields"
    )]
    pub missing_fields: Vec<String>,

    pub avalara_item_group: String,
    pub avalara_category: String,
    pub reason: String,
}

impl ReconciliationResult {
    /// True when the sync stage should act on this row
    pub fn needs_update(&self) -> bool {
        !self.exists_in_avalara || self.is_missing_data
    }
}

fn join_missing_fields<S>(fields: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&fields.join(","))
}

fn split_missing_fields<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(raw.split(',').map(|field| field.trim().to_string()).collect())
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Aggregate counts for one reconciliation run. Printed for humans,
/// never consumed downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    pub not_registered: usize,
    pub missing_data: usize,
    pub complete: usize,
}

impl ReconciliationSummary {
    pub fn total_products(&self) -> usize {
        self.not_registered + self.missing_data + self.complete
    }

    pub fn flagged(&self) -> usize {
        self.not_registered + self.missing_data
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciled {} products: {} not registered, {} missing data, {} complete ({} flagged)",
            self.total_products(),
            self.not_registered,
            self.missing_data,
            self.complete,
            self.flagged()
        )
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine;

/// Shared key normalization: SKUs and item codes compare trimmed and
/// case-insensitive (" ABC-1 " matches "abc-1")
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Index the registry by normalized item code.
    /// Duplicate codes resolve last-write-wins, matching the order the
    /// registry listing returned them.
    fn build_lookup<'a>(&self, items: &'a [RegistryItem]) -> HashMap<String, &'a RegistryItem> {
        let mut lookup = HashMap::with_capacity(items.len());
        for item in items {
            lookup.insert(normalize_code(&item.item_code), item);
        }
        lookup
    }

    /// Diff the catalog against the registry.
    ///
    /// Returns the flagged products in catalog input order plus the
    /// aggregate counts. Complete products contribute to the summary but
    /// produce no row.
    pub fn reconcile(
        &self,
        products: &[CatalogProduct],
        items: &[RegistryItem],
    ) -> (Vec<ReconciliationResult>, ReconciliationSummary) {
        let lookup = self.build_lookup(items);

        let mut results = Vec::new();
        let mut summary = ReconciliationSummary::default();

        for product in products {
            match lookup.get(&normalize_code(&product.sku)) {
                None => {
                    summary.not_registered += 1;
                    results.push(ReconciliationResult {
                        product_id: product.id,
                        sku: product.sku.clone(),
                        name: product.name.clone(),
                        exists_in_avalara: false,
                        is_missing_data: false,
                        missing_fields: Vec::new(),
                        avalara_item_group: String::new(),
                        avalara_category: String::new(),
                        reason: "not registered in Avalara".to_string(),
                    });
                }
                Some(item) => {
                    let mut missing_fields = Vec::new();
                    if item.item_group.trim().is_empty() {
                        missing_fields.push("group".to_string());
                    }
                    if item.category.trim().is_empty() {
                        missing_fields.push("category".to_string());
                    }

                    if missing_fields.is_empty() {
                        // Complete: registered with all required attributes
                        summary.complete += 1;
                        continue;
                    }

                    summary.missing_data += 1;
                    let reason =
                        format!("missing required fields: {}", missing_fields.join(", "));
                    results.push(ReconciliationResult {
                        product_id: product.id,
                        sku: product.sku.clone(),
                        name: product.name.clone(),
                        exists_in_avalara: true,
                        is_missing_data: true,
                        missing_fields,
                        avalara_item_group: item.item_group.clone(),
                        avalara_category: item.category.clone(),
                        reason,
                    });
                }
            }
        }

        (results, summary)
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
