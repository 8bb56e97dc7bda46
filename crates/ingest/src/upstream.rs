//! Typed views of the upstream Pokémon REST resources and the client seam.
//!
//! Only the fields the ingestion pipeline reads are modelled; everything else
//! in the upstream payloads is ignored.

use async_trait::async_trait;
use serde::Deserialize;

use crate::fetch::{FetchClient, FetchError};

// ── Resources ───────────────────────────────────────────────────────

/// `{ name, url }` reference used throughout the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// `GET /pokedex/{region}`
#[derive(Debug, Clone, Deserialize)]
pub struct PokedexListing {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub pokemon_entries: Vec<PokedexEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokedexEntry {
    #[serde(default)]
    pub entry_number: i64,
    pub pokemon_species: NamedResource,
}

/// `GET /pokemon-species/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesResource {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub varieties: Vec<SpeciesVariety>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeciesVariety {
    #[serde(default)]
    pub is_default: bool,
    pub pokemon: NamedResource,
}

/// `GET /pokemon/{name}`
#[derive(Debug, Clone, Deserialize)]
pub struct PokemonResource {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub types: Vec<PokemonTypeSlot>,
    #[serde(default)]
    pub sprites: Sprites,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonTypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    #[serde(default)]
    pub other: OtherSprites,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", default)]
    pub official_artwork: Option<ArtworkSprites>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtworkSprites {
    pub front_default: Option<String>,
}

impl PokemonResource {
    /// Type names ordered by slot.
    pub fn type_names(&self) -> Vec<String> {
        let mut slots: Vec<&PokemonTypeSlot> = self.types.iter().collect();
        slots.sort_by_key(|t| t.slot);
        slots.into_iter().map(|t| t.kind.name.clone()).collect()
    }

    /// Official artwork first, then the default front sprite.
    pub fn preferred_sprite(&self) -> Option<String> {
        self.sprites
            .other
            .official_artwork
            .as_ref()
            .and_then(|a| a.front_default.clone())
            .or_else(|| self.sprites.front_default.clone())
    }
}

/// Parse the trailing numeric path segment of a resource URL
/// (`.../pokemon-species/25/` → `25`). Zero and non-numeric segments yield `None`.
pub fn parse_trailing_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<u32>().ok())
        .filter(|id| *id > 0)
}

// ── Client seam ─────────────────────────────────────────────────────

/// Read-only access to the three upstream resources the pipeline needs.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn pokedex(&self, region: &str) -> Result<PokedexListing, FetchError>;

    /// `reference` is a numeric id or a species name.
    async fn species(&self, reference: &str) -> Result<SpeciesResource, FetchError>;

    async fn pokemon(&self, name: &str) -> Result<PokemonResource, FetchError>;
}

/// [`Upstream`] over HTTP against a PokeAPI-compatible base URL.
pub struct PokeApiClient {
    fetch: FetchClient,
    base_url: String,
}

impl PokeApiClient {
    pub fn new(base_url: impl Into<String>, fetch: FetchClient) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { fetch, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Upstream for PokeApiClient {
    async fn pokedex(&self, region: &str) -> Result<PokedexListing, FetchError> {
        let url = format!("{}/pokedex/{}", self.base_url, region);
        self.fetch.fetch(&url, &format!("pokedex:{region}")).await
    }

    async fn species(&self, reference: &str) -> Result<SpeciesResource, FetchError> {
        let url = format!("{}/pokemon-species/{}", self.base_url, reference);
        self.fetch.fetch(&url, &format!("species:{reference}")).await
    }

    async fn pokemon(&self, name: &str) -> Result<PokemonResource, FetchError> {
        let url = format!("{}/pokemon/{}", self.base_url, name);
        self.fetch.fetch(&url, &format!("pokemon:{name}")).await
    }
}
