// 🔁 Sync Engine - Plant marker custom fields on flagged products
//
// For each product the reconciliation flagged, add the marker custom
// field (value "1") unless it is already present or the platform's
// field ceiling is reached. Every outcome - success, skip, error -
// lands in the sync log; nothing is retried.

use crate::bigcommerce::{ProductFieldStore, CUSTOM_FIELD_LIMIT};
use crate::reconcile::ReconciliationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::thread;
use std::time::Duration;

/// Value written to the marker field; the webhook consumer only checks
/// for the field's presence
const MARKER_VALUE: &str = "1";

/// Fixed pause between products to stay under the API rate limits
const INTER_PRODUCT_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// SYNC LOG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Skipped,
    Error,
}

/// One update attempt. Field names match the sync-log CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub product_id: u64,
    pub sku: String,
    pub exists_in_avalara: bool,
    pub is_missing_data: bool,
    pub status: SyncStatus,
    pub timestamp: DateTime<Utc>,
    pub error_message: String,
    pub custom_field_added: bool,
}

impl SyncLogEntry {
    fn new(row: &ReconciliationResult, status: SyncStatus, message: &str, added: bool) -> Self {
        SyncLogEntry {
            product_id: row.product_id,
            sku: row.sku.clone(),
            exists_in_avalara: row.exists_in_avalara,
            is_missing_data: row.is_missing_data,
            status,
            timestamp: Utc::now(),
            error_message: message.to_string(),
            custom_field_added: added,
        }
    }

    fn success(row: &ReconciliationResult) -> Self {
        Self::new(row, SyncStatus::Success, "", true)
    }

    fn skipped(row: &ReconciliationResult, message: &str) -> Self {
        Self::new(row, SyncStatus::Skipped, message, false)
    }

    fn error(row: &ReconciliationResult, message: &str) -> Self {
        Self::new(row, SyncStatus::Error, message, false)
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Aggregate outcome counts plus an error-type breakdown keyed by the
/// leading token of each error message (everything before its first colon)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub success: usize,
    pub skipped: usize,
    pub error: usize,
    pub error_breakdown: HashMap<String, usize>,
}

impl SyncSummary {
    pub fn from_entries(entries: &[SyncLogEntry]) -> Self {
        let mut summary = SyncSummary::default();

        for entry in entries {
            match entry.status {
                SyncStatus::Success => summary.success += 1,
                SyncStatus::Skipped => summary.skipped += 1,
                SyncStatus::Error => {
                    summary.error += 1;
                    let key = error_key(&entry.error_message).to_string();
                    *summary.error_breakdown.entry(key).or_insert(0) += 1;
                }
            }
        }

        summary
    }

    pub fn total(&self) -> usize {
        self.success + self.skipped + self.error
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed {} products: {} updated, {} skipped, {} errors",
            self.total(),
            self.success,
            self.skipped,
            self.error
        )
    }
}

/// Error messages group by their leading pre-colon token, so
/// "HTTP 422: field invalid" and "HTTP 422: value too long" count together
fn error_key(message: &str) -> &str {
    message.split(':').next().unwrap_or(message).trim()
}

// ============================================================================
// SYNC ENGINE
// ============================================================================

pub struct SyncEngine {
    /// Marker custom field name (configurable per store)
    marker_field_name: String,

    /// Platform ceiling on custom fields per product
    field_limit: usize,

    /// Pause applied after every processed product, uniformly
    delay: Duration,
}

impl SyncEngine {
    pub fn new(marker_field_name: impl Into<String>) -> Self {
        SyncEngine {
            marker_field_name: marker_field_name.into(),
            field_limit: CUSTOM_FIELD_LIMIT,
            delay: INTER_PRODUCT_DELAY,
        }
    }

    /// Builder: override the inter-product delay (tests use zero)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Builder: override the field ceiling
    pub fn with_field_limit(mut self, limit: usize) -> Self {
        self.field_limit = limit;
        self
    }

    /// Process every flagged product sequentially.
    ///
    /// Rows that need no update (complete rows in a hand-edited input
    /// file) are filtered out before processing. Per-product failures
    /// are recorded and the loop continues; each outcome is final for
    /// this run.
    pub fn run<S: ProductFieldStore>(
        &self,
        flagged: &[ReconciliationResult],
        store: &S,
    ) -> (Vec<SyncLogEntry>, SyncSummary) {
        let mut log = Vec::new();

        for row in flagged.iter().filter(|row| row.needs_update()) {
            log.push(self.process_product(row, store));

            // Uniform spacing toward the API, regardless of outcome
            thread::sleep(self.delay);
        }

        let summary = SyncSummary::from_entries(&log);
        (log, summary)
    }

    fn process_product<S: ProductFieldStore>(
        &self,
        row: &ReconciliationResult,
        store: &S,
    ) -> SyncLogEntry {
        let fields = match store.get_custom_fields(row.product_id) {
            Ok(fields) => fields,
            Err(e) => return SyncLogEntry::error(row, &e.to_string()),
        };

        if fields.iter().any(|field| field.name == self.marker_field_name) {
            return SyncLogEntry::skipped(row, "marker already present");
        }

        if fields.len() >= self.field_limit {
            return SyncLogEntry::error(
                row,
                &format!(
                    "custom field limit reached: {} fields in use, ceiling is {}",
                    fields.len(),
                    self.field_limit
                ),
            );
        }

        match store.create_custom_field(row.product_id, &self.marker_field_name, MARKER_VALUE) {
            Ok(_) => SyncLogEntry::success(row),
            Err(e) => SyncLogEntry::error(row, &e.to_string()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigcommerce::CustomField;
    use anyhow::{anyhow, Result};
    use std::cell::RefCell;

    /// In-memory ProductFieldStore: real create semantics plus failure
    /// injection and a create-call counter
    #[derive(Default)]
    struct FakeStore {
        fields: RefCell<HashMap<u64, Vec<CustomField>>>,
        create_calls: RefCell<usize>,
        fail_get_for: Option<u64>,
        fail_create_with: Option<String>,
    }

    impl FakeStore {
        fn with_fields(product_id: u64, fields: Vec<CustomField>) -> Self {
            let store = FakeStore::default();
            store.fields.borrow_mut().insert(product_id, fields);
            store
        }

        fn field(name: &str) -> CustomField {
            CustomField {
                id: None,
                name: name.to_string(),
                value: "x".to_string(),
            }
        }
    }

    impl ProductFieldStore for FakeStore {
        fn get_custom_fields(&self, product_id: u64) -> Result<Vec<CustomField>> {
            if self.fail_get_for == Some(product_id) {
                return Err(anyhow!("HTTP 500: internal error"));
            }
            Ok(self
                .fields
                .borrow()
                .get(&product_id)
                .cloned()
                .unwrap_or_default())
        }

        fn create_custom_field(
            &self,
            product_id: u64,
            name: &str,
            value: &str,
        ) -> Result<CustomField> {
            *self.create_calls.borrow_mut() += 1;

            if let Some(message) = &self.fail_create_with {
                return Err(anyhow!("{}", message));
            }

            let field = CustomField {
                id: Some(1000 + product_id),
                name: name.to_string(),
                value: value.to_string(),
            };
            self.fields
                .borrow_mut()
                .entry(product_id)
                .or_default()
                .push(field.clone());
            Ok(field)
        }
    }

    fn flagged_row(product_id: u64, sku: &str) -> ReconciliationResult {
        ReconciliationResult {
            product_id,
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            exists_in_avalara: false,
            is_missing_data: false,
            missing_fields: Vec::new(),
            avalara_item_group: String::new(),
            avalara_category: String::new(),
            reason: "not registered in Avalara".to_string(),
        }
    }

    fn test_engine() -> SyncEngine {
        SyncEngine::new("avalara_resync").with_delay(Duration::ZERO)
    }

    #[test]
    fn test_marker_created_with_value_one() {
        let store = FakeStore::default();
        let rows = vec![flagged_row(1, "SKU-1")];

        let (log, summary) = test_engine().run(&rows, &store);

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].status, SyncStatus::Success);
        assert!(log[0].custom_field_added);
        assert_eq!(summary.success, 1);

        let fields = store.fields.borrow();
        let created = &fields[&1][0];
        assert_eq!(created.name, "avalara_resync");
        assert_eq!(created.value, "1");

        println!("✅ Marker created: {}={}", created.name, created.value);
    }

    #[test]
    fn test_second_run_skips_every_prior_success() {
        let store = FakeStore::default();
        let rows = vec![flagged_row(1, "SKU-1"), flagged_row(2, "SKU-2")];
        let engine = test_engine();

        let (_, first) = engine.run(&rows, &store);
        assert_eq!(first.success, 2);

        let (log, second) = engine.run(&rows, &store);

        assert_eq!(second.skipped, 2);
        assert_eq!(second.success, 0);
        assert!(log
            .iter()
            .all(|entry| entry.error_message == "marker already present"));
        assert!(log.iter().all(|entry| !entry.custom_field_added));

        println!("✅ Second run skipped every product");
    }

    #[test]
    fn test_field_ceiling_blocks_create() {
        let existing: Vec<CustomField> = (0..CUSTOM_FIELD_LIMIT)
            .map(|i| FakeStore::field(&format!("field_{}", i)))
            .collect();
        let store = FakeStore::with_fields(7, existing);
        let rows = vec![flagged_row(7, "FULL")];

        let (log, summary) = test_engine().run(&rows, &store);

        assert_eq!(log[0].status, SyncStatus::Error);
        assert!(!log[0].custom_field_added);
        assert!(log[0].error_message.contains("ceiling is 50"));
        // No create call was issued
        assert_eq!(*store.create_calls.borrow(), 0);
        assert_eq!(
            summary.error_breakdown.get("custom field limit reached"),
            Some(&1)
        );

        println!("✅ Ceiling hit: {}", log[0].error_message);
    }

    #[test]
    fn test_get_failure_is_logged_and_loop_continues() {
        let store = FakeStore {
            fail_get_for: Some(1),
            ..FakeStore::default()
        };
        let rows = vec![flagged_row(1, "BAD"), flagged_row(2, "GOOD")];

        let (log, summary) = test_engine().run(&rows, &store);

        assert_eq!(log.len(), 2);
        assert_eq!(log[0].status, SyncStatus::Error);
        assert_eq!(log[1].status, SyncStatus::Success);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.error_breakdown.get("HTTP 500"), Some(&1));

        println!("✅ Per-product failure did not abort the run");
    }

    #[test]
    fn test_create_failure_keeps_status_and_message() {
        let store = FakeStore {
            fail_create_with: Some("HTTP 422: The field value is invalid.".to_string()),
            ..FakeStore::default()
        };
        let rows = vec![flagged_row(3, "REJECTED")];

        let (log, summary) = test_engine().run(&rows, &store);

        assert_eq!(log[0].status, SyncStatus::Error);
        assert_eq!(log[0].error_message, "HTTP 422: The field value is invalid.");
        assert_eq!(summary.error_breakdown.get("HTTP 422"), Some(&1));

        println!("✅ Create failure recorded verbatim");
    }

    #[test]
    fn test_complete_rows_are_refiltered_out() {
        // Simulates a hand-edited input file containing a complete row
        let mut complete = flagged_row(9, "DONE");
        complete.exists_in_avalara = true;
        complete.is_missing_data = false;

        let store = FakeStore::default();
        let (log, summary) = test_engine().run(&[complete], &store);

        assert!(log.is_empty());
        assert_eq!(summary.total(), 0);
        assert_eq!(*store.create_calls.borrow(), 0);

        println!("✅ Complete row never reached the API");
    }

    #[test]
    fn test_error_key_splits_on_first_colon() {
        assert_eq!(error_key("HTTP 422: bad: worse"), "HTTP 422");
        assert_eq!(error_key("connection refused"), "connection refused");
        assert_eq!(error_key(""), "");

        println!("✅ Error keys take the leading pre-colon token");
    }
}
