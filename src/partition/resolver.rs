//! Advertisable resolver
//!
//! Nearly every stream is scoped by advertisable. The id list is fetched
//! once per run and shared by every stream through this instance.

use crate::catalog;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::types::{JsonValue, QueryParams};
use std::collections::HashSet;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Fetch-once cache of advertisable eids
#[derive(Debug, Default)]
pub struct AdvertisableResolver {
    cache: OnceCell<Vec<String>>,
}

impl AdvertisableResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with a fixed list of ids, skipping the fetch
    pub fn with_ids(ids: Vec<String>) -> Self {
        Self {
            cache: OnceCell::new_with(Some(ids)),
        }
    }

    /// Advertisable eids in API response order.
    ///
    /// The first call fetches; later calls return the cached list. A failed
    /// fetch is not cached.
    pub async fn list_scope_ids(&self, client: &dyn ApiClient) -> Result<&[String]> {
        let ids = self
            .cache
            .get_or_try_init(|| Self::fetch(client))
            .await?;
        Ok(ids.as_slice())
    }

    /// Whether the list has been resolved
    pub fn is_resolved(&self) -> bool {
        self.cache.initialized()
    }

    async fn fetch(client: &dyn ApiClient) -> Result<Vec<String>> {
        let stream = catalog::get(catalog::ADVERTISABLES)?;
        let body = client
            .get(stream.api, stream.endpoint, &QueryParams::new())
            .await?;

        let records = body
            .get("results")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| Error::decode(stream.endpoint, "missing 'results' array"))?;

        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            match extract_eid(record) {
                Some(eid) => {
                    if seen.insert(eid.clone()) {
                        ids.push(eid);
                    }
                }
                None => warn!("Skipping advertisable without an eid"),
            }
        }

        info!(count = ids.len(), "Resolved advertisables");
        Ok(ids)
    }
}

fn extract_eid(record: &JsonValue) -> Option<String> {
    match record.get("eid")? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
