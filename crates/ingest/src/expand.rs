//! Species/variety expansion: one listing entry → one cached region row.
//!
//! Variety fetches run in fixed-size concurrent batches. Every fetch in a
//! batch is awaited to completion and failures are dropped individually, so a
//! single bad variety never cancels its siblings.

use futures::future::join_all;
use tracing::{debug, warn};

use dex_core::{DexId, RegionEntry, VarietyInfo};

use crate::fetch::FetchError;
use crate::upstream::{parse_trailing_id, PokedexEntry, PokemonResource, SpeciesResource, Upstream};

/// Result of expanding one listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    Entry(RegionEntry),
    /// The species id could not be resolved to a positive integer.
    Skipped { species: String },
}

/// Expand `entry` into a full [`RegionEntry`] for `region`.
///
/// Errors are returned only for the species fetch itself; variety failures
/// are logged and omitted from `forms`.
pub async fn expand_entry(
    upstream: &dyn Upstream,
    region: &str,
    entry: &PokedexEntry,
    variety_batch_size: usize,
) -> Result<Expansion, FetchError> {
    let species_ref = &entry.pokemon_species;

    let (dex_id, species) = match parse_trailing_id(&species_ref.url) {
        Some(id) => (id, upstream.species(&id.to_string()).await?),
        None => {
            debug!(species = %species_ref.name, url = %species_ref.url, "no id in species url, fetching by name");
            let species = upstream.species(&species_ref.name).await?;
            match resolve_id(species.id) {
                Some(id) => (id, species),
                None => {
                    warn!(
                        region,
                        species = %species_ref.name,
                        id = species.id,
                        "species id unresolvable, skipping"
                    );
                    return Ok(Expansion::Skipped {
                        species: species_ref.name.clone(),
                    });
                }
            }
        }
    };

    let varieties = fetch_varieties(upstream, &species, variety_batch_size).await;
    Ok(Expansion::Entry(build_entry(region, dex_id, &species, &varieties)))
}

fn resolve_id(id: i64) -> Option<DexId> {
    DexId::try_from(id).ok().filter(|id| *id > 0)
}

/// Fetch every variety of `species`, `batch_size` at a time. The returned
/// list keeps upstream variety order and contains only successful fetches.
async fn fetch_varieties(
    upstream: &dyn Upstream,
    species: &SpeciesResource,
    batch_size: usize,
) -> Vec<PokemonResource> {
    let names: Vec<&str> = species
        .varieties
        .iter()
        .map(|v| v.pokemon.name.as_str())
        .collect();

    let mut fetched = Vec::with_capacity(names.len());
    for batch in names.chunks(batch_size.max(1)) {
        let outcomes = join_all(batch.iter().map(|name| upstream.pokemon(name))).await;
        for (name, outcome) in batch.iter().zip(outcomes) {
            match outcome {
                Ok(pokemon) => fetched.push(pokemon),
                Err(e) => warn!(species = %species.name, variety = %name, error = %e, "variety fetch failed, omitting"),
            }
        }
    }
    fetched
}

/// Assemble the row. The canonical variety is the one named like the species,
/// else the first that fetched; with none, types and sprite stay empty.
fn build_entry(
    region: &str,
    dex_id: DexId,
    species: &SpeciesResource,
    varieties: &[PokemonResource],
) -> RegionEntry {
    let base = varieties
        .iter()
        .find(|p| p.name == species.name)
        .or_else(|| varieties.first());

    let forms = varieties
        .iter()
        .map(|p| VarietyInfo {
            form_name: p.name.clone(),
            form_id: resolve_id(p.id),
            types: p.type_names(),
            sprite: p.preferred_sprite(),
        })
        .collect();

    let mut entry = RegionEntry {
        region: region.to_string(),
        dex_id,
        name: species.name.to_lowercase(),
        types: base.map(PokemonResource::type_names).unwrap_or_default(),
        sprite: base.and_then(PokemonResource::preferred_sprite),
        forms,
    };
    entry.dedupe_forms();
    entry
}
