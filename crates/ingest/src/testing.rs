//! In-process [`Upstream`] fake for tests, here and in dependent crates
//! through the `testing` feature.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::fetch::FetchError;
use crate::upstream::{
    NamedResource, PokedexEntry, PokedexListing, PokemonResource, PokemonTypeSlot,
    SpeciesResource, SpeciesVariety, Sprites, Upstream,
};

#[derive(Default)]
pub struct FakeUpstream {
    pub listings: HashMap<String, PokedexListing>,
    /// Keyed by both numeric id and name.
    pub species: HashMap<String, SpeciesResource>,
    pub pokemon: HashMap<String, PokemonResource>,
    /// Pokémon names whose fetch fails with HTTP 500.
    pub failing: HashSet<String>,
    pub pokedex_latency: Duration,
    pub species_latency: Duration,
    pub pokemon_latency: Duration,
    pub pokedex_calls: AtomicUsize,
    species_in_flight: AtomicUsize,
    /// Highest number of concurrent species fetches seen.
    pub max_species_in_flight: AtomicUsize,
    in_flight: AtomicUsize,
    /// Highest number of concurrent pokemon fetches seen.
    pub max_in_flight: AtomicUsize,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a species with the given varieties; every variety gets a
    /// Pokémon resource with one `types` entry and no sprite.
    pub fn add_species(&mut self, id: i64, name: &str, varieties: &[(i64, &str, &str)]) {
        let species = SpeciesResource {
            id,
            name: name.to_string(),
            varieties: varieties
                .iter()
                .enumerate()
                .map(|(i, (_, variety, _))| SpeciesVariety {
                    is_default: i == 0,
                    pokemon: named(variety, ""),
                })
                .collect(),
        };
        self.species.insert(id.to_string(), species.clone());
        self.species.insert(name.to_string(), species);
        for (pokemon_id, variety, kind) in varieties {
            self.pokemon.insert(variety.to_string(), pokemon(*pokemon_id, variety, &[*kind]));
        }
    }

    pub fn add_listing(&mut self, region: &str, species: &[(&str, &str)]) {
        let listing = PokedexListing {
            id: 1,
            name: region.to_string(),
            pokemon_entries: species
                .iter()
                .enumerate()
                .map(|(i, (name, url))| PokedexEntry {
                    entry_number: i as i64 + 1,
                    pokemon_species: named(name, url),
                })
                .collect(),
        };
        self.listings.insert(region.to_string(), listing);
    }

    /// Register `region` listing single-variety species `(id, name, type)`
    /// in order, each reachable through its species URL.
    pub fn add_region(&mut self, region: &str, species: &[(i64, &str, &str)]) {
        let urls: Vec<String> = species.iter().map(|(id, _, _)| species_url(*id)).collect();
        for (id, name, kind) in species {
            self.add_species(*id, name, &[(*id, *name, *kind)]);
        }
        let listing: Vec<(&str, &str)> = species
            .iter()
            .zip(&urls)
            .map(|((_, name, _), url)| (*name, url.as_str()))
            .collect();
        self.add_listing(region, &listing);
    }

    pub fn fail_pokemon(&mut self, name: &str) {
        self.failing.insert(name.to_string());
    }
}

pub fn named(name: &str, url: &str) -> NamedResource {
    NamedResource {
        name: name.to_string(),
        url: url.to_string(),
    }
}

pub fn pokemon(id: i64, name: &str, types: &[&str]) -> PokemonResource {
    PokemonResource {
        id,
        name: name.to_string(),
        types: types
            .iter()
            .enumerate()
            .map(|(i, t)| PokemonTypeSlot {
                slot: i as u32 + 1,
                kind: named(t, ""),
            })
            .collect(),
        sprites: Sprites::default(),
    }
}

pub fn species_url(id: i64) -> String {
    format!("https://pokeapi.co/api/v2/pokemon-species/{id}/")
}

fn not_found(label: String) -> FetchError {
    FetchError::Status { label, status: 404 }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn pokedex(&self, region: &str) -> Result<PokedexListing, FetchError> {
        self.pokedex_calls.fetch_add(1, Ordering::SeqCst);
        if !self.pokedex_latency.is_zero() {
            tokio::time::sleep(self.pokedex_latency).await;
        }
        self.listings
            .get(region)
            .cloned()
            .ok_or_else(|| not_found(format!("pokedex:{region}")))
    }

    async fn species(&self, reference: &str) -> Result<SpeciesResource, FetchError> {
        let now = self.species_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_species_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.species_latency.is_zero() {
            tokio::time::sleep(self.species_latency).await;
        }
        self.species_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.species
            .get(reference)
            .cloned()
            .ok_or_else(|| not_found(format!("species:{reference}")))
    }

    async fn pokemon(&self, name: &str) -> Result<PokemonResource, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.pokemon_latency.is_zero() {
            tokio::time::sleep(self.pokemon_latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(name) {
            return Err(FetchError::Status {
                label: format!("pokemon:{name}"),
                status: 500,
            });
        }
        self.pokemon
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(format!("pokemon:{name}")))
    }
}
