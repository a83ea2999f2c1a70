// 🔧 Configuration - Environment-driven settings for both platforms
// Validated once at startup; every stage receives the same Config

use anyhow::{bail, Result};
use std::env;

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

const ENV_STORE_HASH: &str = "BIGCOMMERCE_STORE_HASH";
const ENV_ACCESS_TOKEN: &str = "BIGCOMMERCE_ACCESS_TOKEN";
const ENV_AVALARA_TOKEN: &str = "AVALARA_BEARER_TOKEN";
const ENV_AVALARA_COMPANY: &str = "AVALARA_COMPANY_ID";
const ENV_AVALARA_BASE_URL: &str = "AVALARA_BASE_URL";
const ENV_MARKER_FIELD: &str = "MARKER_FIELD_NAME";

/// Production AvaTax endpoint; override with AVALARA_BASE_URL for sandbox
const DEFAULT_AVALARA_BASE_URL: &str = "https://rest.avatax.com";

/// Custom field planted on gapped products to trigger the webhook re-sync
const DEFAULT_MARKER_FIELD: &str = "avalara_resync";

// ============================================================================
// CONFIG
// ============================================================================

/// Validated configuration for one pipeline run
///
/// Built once in main() and shared by every stage. Missing required
/// variables abort the process before any stage does work, naming each
/// missing item.
#[derive(Debug, Clone)]
pub struct Config {
    /// BigCommerce store hash (the `stores/{hash}` path segment)
    pub store_hash: String,

    /// BigCommerce API access token (X-Auth-Token header)
    pub access_token: String,

    /// Avalara bearer credential (Authorization header)
    pub avalara_token: String,

    /// Avalara company whose item registry is fetched
    pub avalara_company_id: String,

    /// Avalara API base URL (production by default, sandbox via override)
    pub avalara_base_url: String,

    /// Name of the marker custom field written by the sync stage
    pub marker_field_name: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded best-effort first,
    /// so local runs don't need exported variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a Config from any variable source.
    ///
    /// Validation collects every missing required variable and reports all
    /// of them in a single error, so one run surfaces the full gap list.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();

        let mut require = |name: &str| -> String {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => value,
                _ => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        };

        let store_hash = require(ENV_STORE_HASH);
        let access_token = require(ENV_ACCESS_TOKEN);
        let avalara_token = require(ENV_AVALARA_TOKEN);
        let avalara_company_id = require(ENV_AVALARA_COMPANY);

        if !missing.is_empty() {
            bail!(
                "Missing required configuration: {}",
                missing.join(", ")
            );
        }

        let avalara_base_url = lookup(ENV_AVALARA_BASE_URL)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AVALARA_BASE_URL.to_string());

        let marker_field_name = lookup(ENV_MARKER_FIELD)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MARKER_FIELD.to_string());

        Ok(Config {
            store_hash,
            access_token,
            avalara_token,
            avalara_company_id,
            avalara_base_url: avalara_base_url.trim_end_matches('/').to_string(),
            marker_field_name,
        })
    }

    /// BigCommerce v3 API base URL for this store
    pub fn bigcommerce_base_url(&self) -> String {
        format!("https://api.bigcommerce.com/stores/{}/v3", self.store_hash)
    }
}

// ============================================================================
// TESTS
// ============================================================================
