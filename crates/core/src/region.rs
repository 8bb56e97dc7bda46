//! Cached regional Pokédex rows and the paged view served over HTTP.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DexError;

/// National dex number. Always positive for rows that reach the cache.
pub type DexId = u32;

/// One discovered variety of a species (base form included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VarietyInfo {
    /// Variety name, unique within its species.
    pub form_name: String,
    /// Upstream numeric Pokémon id; used for de-duplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<u32>,
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
}

/// A species row cached for one region, keyed by `(region, dex_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegionEntry {
    pub region: String,
    #[schema(value_type = u32)]
    pub dex_id: DexId,
    pub name: String,
    /// Types of the canonical variety, in slot order.
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    #[serde(default)]
    pub forms: Vec<VarietyInfo>,
}

impl RegionEntry {
    /// Drop forms whose `form_id` already appeared earlier in the list.
    /// Forms without an id are always kept.
    pub fn dedupe_forms(&mut self) {
        let mut seen = HashSet::new();
        self.forms.retain(|form| match form.form_id {
            Some(id) => seen.insert(id),
            None => true,
        });
    }
}

/// One page of a region's cached rows, ordered by ascending dex id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegionPage {
    pub results: Vec<RegionEntry>,
    pub total_count: u64,
    pub has_more: bool,
}

impl RegionPage {
    pub fn new(results: Vec<RegionEntry>, total_count: u64, offset: u64, limit: u32) -> Self {
        Self {
            results,
            total_count,
            has_more: has_more(offset, limit, total_count),
        }
    }

    /// Replace `total_count` with the upstream listing length and recompute
    /// `has_more` against it. The cache may still hold fewer rows than this.
    pub fn with_total(mut self, total_count: u64, offset: u64, limit: u32) -> Self {
        self.total_count = total_count;
        self.has_more = has_more(offset, limit, total_count);
        self
    }
}

fn has_more(offset: u64, limit: u32, total_count: u64) -> bool {
    offset.saturating_add(u64::from(limit)) < total_count
}

/// Trim and lowercase a caller-supplied region name.
///
/// Region names are upstream slugs (`kanto`, `original-johto`), so only ASCII
/// alphanumerics and `-` are accepted.
pub fn normalize_region(raw: &str) -> Result<String, DexError> {
    let region = raw.trim().to_ascii_lowercase();
    if region.is_empty() {
        return Err(DexError::MissingRegion);
    }
    if !region
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(DexError::InvalidRegion(raw.to_string()));
    }
    Ok(region)
}
