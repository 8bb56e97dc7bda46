use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub ingest: IngestConfig,
    pub postgres: PostgresConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DEX_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DEX_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            upstream: UpstreamConfig::from_env_profiled(p),
            ingest: IngestConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  upstream:  base={}, attempts={}, base_delay={}ms, timeout={}ms",
            self.upstream.base_url,
            self.upstream.attempts,
            self.upstream.base_delay_ms,
            self.upstream.timeout_ms
        );
        tracing::info!(
            "  ingest:    batch={}, variety_batch={}, pacing={}ms",
            self.ingest.batch_size,
            self.ingest.variety_batch_size,
            self.ingest.batch_delay_ms
        );
        if self.postgres.is_configured() {
            tracing::info!("  postgres:  host={}, db={}", self.postgres.host, self.postgres.database);
        } else {
            tracing::info!("  postgres:  (not configured, in-memory cache)");
        }
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
        }
    }
}

// ── Upstream Pokémon API ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Attempts per request, first try included.
    pub attempts: u32,
    pub base_delay_ms: u64,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
    /// Upper bound of random jitter added to each backoff delay (0 = none).
    pub jitter_ms: u64,
    /// Budget for the authoritative listing-length fetch on the request path.
    pub total_timeout_ms: u64,
}

impl UpstreamConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            base_url: profiled_env_or(p, "POKEAPI_BASE_URL", "https://pokeapi.co/api/v2"),
            attempts: profiled_env_u32(p, "FETCH_ATTEMPTS", 3),
            base_delay_ms: profiled_env_u64(p, "FETCH_BASE_DELAY_MS", 250),
            timeout_ms: profiled_env_u64(p, "FETCH_TIMEOUT_MS", 15_000),
            jitter_ms: profiled_env_u64(p, "FETCH_JITTER_MS", 0),
            total_timeout_ms: profiled_env_u64(p, "TOTAL_TIMEOUT_MS", 5_000),
        }
    }
}

// ── Ingestion pacing ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Listing entries expanded concurrently per batch.
    pub batch_size: u32,
    /// Variety fetches issued concurrently per batch within one species.
    pub variety_batch_size: u32,
    /// Pause between listing batches.
    pub batch_delay_ms: u64,
}

impl IngestConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            batch_size: profiled_env_u32(p, "INGEST_BATCH_SIZE", 5),
            variety_batch_size: profiled_env_u32(p, "VARIETY_BATCH_SIZE", 5),
            batch_delay_ms: profiled_env_u64(p, "INGEST_BATCH_DELAY_MS", 150),
        }
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "regional_dex"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 10),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    pub fn is_configured(&self) -> bool {
        self.username.is_some()
    }
}
