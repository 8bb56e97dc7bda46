//! `GET /api/regional-pokedex?region=&limit=&offset=&reset=`

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::error;
use utoipa::IntoParams;

use dex_core::{normalize_region, DexError, RegionPage};

use super::{bad_request, internal_error, ApiResult, ErrorResponse};
use crate::orchestrator::PageRequest;
use crate::state::AppState;

pub const DEFAULT_LIMIT: u32 = 40;
pub const MAX_LIMIT: u32 = 200;

/// Raw query string. Numbers are kept as text so a malformed value falls
/// back to its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Upstream region slug, e.g. `kanto`. Required.
    pub region: Option<String>,
    /// Page size, clamped to 1..=200 (default 40).
    #[param(value_type = Option<u32>)]
    pub limit: Option<String>,
    /// Rows to skip, clamped to >= 0 (default 0).
    #[param(value_type = Option<u64>)]
    pub offset: Option<String>,
    /// `1` or `true` clears and rebuilds the region before reading.
    #[param(value_type = Option<bool>)]
    pub reset: Option<String>,
}

impl PageQuery {
    pub fn into_request(self) -> Result<PageRequest, DexError> {
        let region = normalize_region(self.region.as_deref().unwrap_or(""))?;
        Ok(PageRequest {
            region,
            limit: parse_limit(self.limit.as_deref()),
            offset: parse_offset(self.offset.as_deref()),
            reset: parse_flag(self.reset.as_deref()),
        })
    }
}

fn parse_limit(raw: Option<&str>) -> u32 {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        // Clamped into 1..=200, so the cast cannot truncate.
        Some(limit) => limit.clamp(1, i64::from(MAX_LIMIT)) as u32,
        None => DEFAULT_LIMIT,
    }
}

fn parse_offset(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .map(|offset| offset.max(0) as u64)
        .unwrap_or(0)
}

fn parse_flag(raw: Option<&str>) -> bool {
    raw.map(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true")
    })
    .unwrap_or(false)
}

#[utoipa::path(
    get,
    path = "/api/regional-pokedex",
    tag = "Regional Pokedex",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of the region's cached rows", body = RegionPage),
        (status = 400, description = "Missing or invalid region", body = ErrorResponse),
        (status = 500, description = "Cache read failed", body = ErrorResponse)
    )
)]
pub async fn regional_pokedex(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<RegionPage>> {
    let request = query
        .into_request()
        .map_err(|e| bad_request(e.to_string()))?;

    state
        .orchestrator
        .serve(&request)
        .await
        .map(Json)
        .map_err(|e| {
            error!(region = %request.region, error = %e, "regional pokedex request failed");
            internal_error()
        })
}
