// 🧾 Avalara AvaTax - Item registry client
// Pulls every item for the configured company via $skip/$top pagination

use crate::config::Config;
use crate::pagination::drain_offset_pages;
use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// AvaTax listing page size ($top)
pub const ITEMS_PAGE_SIZE: usize = 100;

/// Per-request deadline; a slower response is treated as a failed page
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// REGISTRY ITEM
// ============================================================================

/// One item from the Avalara registry, reduced to the fields the
/// reconciliation cares about. Field names match both the AvaTax JSON
/// payload and the intermediate CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryItem {
    /// Unique key; matched against product SKUs case-insensitively
    #[serde(rename = "itemCode", default, deserialize_with = "null_to_empty")]
    pub item_code: String,

    #[serde(rename = "itemGroup", default, deserialize_with = "null_to_empty")]
    pub item_group: String,

    #[serde(default, deserialize_with = "null_to_empty")]
    pub category: String,
}

/// AvaTax sends unset fields as explicit nulls; fold those into ""
fn null_to_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// AvaTax wraps listings in `{"value": [...]}`; some proxies hand back
/// the bare array instead. Accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsEnvelope {
    Wrapped { value: Vec<RegistryItem> },
    Bare(Vec<RegistryItem>),
}

impl ItemsEnvelope {
    fn into_items(self) -> Vec<RegistryItem> {
        match self {
            ItemsEnvelope::Wrapped { value } => value,
            ItemsEnvelope::Bare(items) => items,
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct AvalaraClient {
    http: Client,
    base_url: String,
    token: String,
    company_id: String,
}

impl AvalaraClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Avalara HTTP client")?;

        Ok(AvalaraClient {
            http,
            base_url: config.avalara_base_url.clone(),
            token: config.avalara_token.clone(),
            company_id: config.avalara_company_id.clone(),
        })
    }

    /// Fetch the company's full item registry.
    ///
    /// Pages through the listing until a short page signals the end. A
    /// failed page stops the loop early; items fetched up to that point
    /// are kept so the stage can still persist a partial registry.
    pub fn fetch_all_items(&self) -> Vec<RegistryItem> {
        let (items, error) =
            drain_offset_pages(ITEMS_PAGE_SIZE, |skip| self.fetch_items_page(skip));

        if let Some(message) = error {
            println!("⚠️  Avalara item fetch stopped early: {}", message);
            println!("   Keeping {} items fetched before the failure", items.len());
        }

        items
    }

    fn fetch_items_page(&self, skip: usize) -> Result<Vec<RegistryItem>> {
        let url = format!(
            "{}/api/v2/companies/{}/items",
            self.base_url, self.company_id
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("$skip", skip.to_string()),
                ("$top", ITEMS_PAGE_SIZE.to_string()),
            ])
            .send()
            .with_context(|| format!("Avalara items request failed ($skip={})", skip))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("HTTP {}: {}", status.as_u16(), body);
        }

        let envelope: ItemsEnvelope = response
            .json()
            .context("Failed to decode Avalara items response")?;

        Ok(envelope.into_items())
    }
}

// ============================================================================
// TESTS
// ============================================================================
