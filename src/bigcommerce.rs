// 🛒 BigCommerce - Catalog client and product custom-field API
// Pulls visible products (page/limit pagination) and reads/writes the
// per-product custom fields used as the re-sync marker channel

use crate::config::Config;
use crate::pagination::drain_numbered_pages;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// BigCommerce caps listing pages at 250 records
pub const PRODUCTS_PAGE_SIZE: usize = 250;

/// Hard platform limit on custom fields per product
pub const CUSTOM_FIELD_LIMIT: usize = 50;

/// Per-request deadline; a slower response is treated as a failed page
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// CORE TYPES
// ============================================================================

/// One storefront product, reduced to the reconciliation fields.
/// Field names match the intermediate CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: u64,

    #[serde(default, deserialize_with = "null_to_empty")]
    pub sku: String,

    #[serde(default, deserialize_with = "null_to_empty")]
    pub name: String,
}

impl CatalogProduct {
    /// A product participates in reconciliation only with a real SKU
    pub fn has_valid_sku(&self) -> bool {
        !self.sku.trim().is_empty()
    }
}

/// A product custom field (the side-channel attribute resource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    #[serde(default)]
    pub id: Option<u64>,

    pub name: String,

    pub value: String,
}

/// BigCommerce sends unset strings as explicit nulls; fold those into ""
fn null_to_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// v3 responses wrap collections in `{"data": [...]}`; tolerate the bare
/// array shape as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    fn into_records(self) -> Vec<T> {
        match self {
            ListEnvelope::Wrapped { data } => data,
            ListEnvelope::Bare(records) => records,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObjectEnvelope<T> {
    data: T,
}

/// Structured error body (`{"status": 422, "title": "..."}`); anything
/// else falls back to the raw response text.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    title: Option<String>,
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Split fetched products into reconcilable and blank-SKU records.
/// The invalid set is reported, never persisted.
pub fn partition_by_sku(products: Vec<CatalogProduct>) -> (Vec<CatalogProduct>, Vec<CatalogProduct>) {
    products
        .into_iter()
        .partition(CatalogProduct::has_valid_sku)
}

// ============================================================================
// PRODUCT FIELD STORE (seam for the sync engine)
// ============================================================================

/// Read/create access to a product's custom fields.
///
/// The sync engine runs against this trait so its conditional-write flow
/// can be exercised with an in-memory store in tests.
pub trait ProductFieldStore {
    /// Current custom fields for a product. A product the platform does
    /// not know (404) yields an empty list, not an error.
    fn get_custom_fields(&self, product_id: u64) -> Result<Vec<CustomField>>;

    /// Create one custom field on a product.
    fn create_custom_field(&self, product_id: u64, name: &str, value: &str)
        -> Result<CustomField>;
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct BigCommerceClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl BigCommerceClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build BigCommerce HTTP client")?;

        Ok(BigCommerceClient {
            http,
            base_url: config.bigcommerce_base_url(),
            access_token: config.access_token.clone(),
        })
    }

    /// Fetch every visible product in the catalog.
    ///
    /// Pages through `/catalog/products` until a short page signals the
    /// end. A failed page stops the loop early; products fetched up to
    /// that point are kept so the stage can still persist a partial
    /// catalog.
    pub fn fetch_visible_products(&self) -> Vec<CatalogProduct> {
        let (products, error) =
            drain_numbered_pages(PRODUCTS_PAGE_SIZE, |page| self.fetch_products_page(page));

        if let Some(message) = error {
            println!("⚠️  Product fetch stopped early: {}", message);
            println!(
                "   Keeping {} products fetched before the failure",
                products.len()
            );
        }

        products
    }

    fn fetch_products_page(&self, page: usize) -> Result<Vec<CatalogProduct>> {
        let url = format!("{}/catalog/products", self.base_url);

        let response = self
            .http
            .get(&url)
            .header("X-Auth-Token", self.access_token.as_str())
            .query(&[
                ("page", page.to_string()),
                ("limit", PRODUCTS_PAGE_SIZE.to_string()),
                ("is_visible", "true".to_string()),
            ])
            .send()
            .with_context(|| format!("BigCommerce products request failed (page={})", page))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP {}: {}", status.as_u16(), response.text().unwrap_or_default());
        }

        let envelope: ListEnvelope<CatalogProduct> = response
            .json()
            .context("Failed to decode BigCommerce products response")?;

        Ok(envelope.into_records())
    }

    fn custom_fields_url(&self, product_id: u64) -> String {
        format!("{}/catalog/products/{}/custom-fields", self.base_url, product_id)
    }

    /// Turn a non-success response into the `HTTP <status>: <message>`
    /// error shape the sync log records.
    fn api_error(status: StatusCode, body: String) -> anyhow::Error {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|parsed| parsed.title)
            .unwrap_or(body);

        anyhow::anyhow!("HTTP {}: {}", status.as_u16(), message)
    }
}

impl ProductFieldStore for BigCommerceClient {
    fn get_custom_fields(&self, product_id: u64) -> Result<Vec<CustomField>> {
        let response = self
            .http
            .get(self.custom_fields_url(product_id))
            .header("X-Auth-Token", self.access_token.as_str())
            .send()
            .with_context(|| format!("Custom field lookup failed (product {})", product_id))?;

        let status = response.status();

        // Products with no field resource come back 404; that simply
        // means "no custom fields yet"
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(Self::api_error(status, response.text().unwrap_or_default()));
        }

        let envelope: ListEnvelope<CustomField> = response
            .json()
            .context("Failed to decode custom fields response")?;

        Ok(envelope.into_records())
    }

    fn create_custom_field(
        &self,
        product_id: u64,
        name: &str,
        value: &str,
    ) -> Result<CustomField> {
        let response = self
            .http
            .post(self.custom_fields_url(product_id))
            .header("X-Auth-Token", self.access_token.as_str())
            .json(&serde_json::json!({ "name": name, "value": value }))
            .send()
            .with_context(|| format!("Custom field create failed (product {})", product_id))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response.text().unwrap_or_default()));
        }

        let envelope: ObjectEnvelope<CustomField> = response
            .json()
            .context("Failed to decode custom field create response")?;

        Ok(envelope.data)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, sku: &str, name: &str) -> CatalogProduct {
        CatalogProduct {
            id,
            sku: sku.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_partition_drops_blank_and_whitespace_skus() {
        let products = vec![
            product(1, "SKU-1", "Widget"),
            product(2, "", "No SKU"),
            product(3, "   ", "Whitespace SKU"),
            product(4, "SKU-4", "Gadget"),
        ];

        let (valid, invalid) = partition_by_sku(products);

        assert_eq!(valid.len(), 2);
        assert_eq!(invalid.len(), 2);
        assert!(valid.iter().all(CatalogProduct::has_valid_sku));
        assert_eq!(invalid[0].id, 2);
        assert_eq!(invalid[1].id, 3);

        println!("✅ Blank and whitespace SKUs partitioned out");
    }

    #[test]
    fn test_products_envelope_decodes_wrapped_and_bare() {
        let wrapped = r#"{"data": [{"id": 7, "sku": "A-1", "name": "Anvil"}], "meta": {}}"#;
        let records = serde_json::from_str::<ListEnvelope<CatalogProduct>>(wrapped)
            .unwrap()
            .into_records();
        assert_eq!(records, vec![product(7, "A-1", "Anvil")]);

        let bare = r#"[{"id": 8, "sku": null, "name": "Nameless"}]"#;
        let records = serde_json::from_str::<ListEnvelope<CatalogProduct>>(bare)
            .unwrap()
            .into_records();
        assert_eq!(records[0].sku, "");

        println!("✅ Product envelopes decoded (wrapped + bare, null sku)");
    }

    #[test]
    fn test_custom_field_envelope_decodes() {
        let body = r#"{"data": [{"id": 11, "name": "avalara_resync", "value": "1"}]}"#;
        let fields = serde_json::from_str::<ListEnvelope<CustomField>>(body)
            .unwrap()
            .into_records();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "avalara_resync");
        assert_eq!(fields[0].value, "1");

        println!("✅ Custom field envelope decoded");
    }

    #[test]
    fn test_api_error_prefers_structured_title() {
        let err = BigCommerceClient::api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"status": 422, "title": "The field value is invalid."}"#.to_string(),
        );
        assert_eq!(err.to_string(), "HTTP 422: The field value is invalid.");

        let raw = BigCommerceClient::api_error(
            StatusCode::BAD_GATEWAY,
            "<html>bad gateway</html>".to_string(),
        );
        assert_eq!(raw.to_string(), "HTTP 502: <html>bad gateway</html>");

        println!("✅ API errors keep status code and best message");
    }
}
