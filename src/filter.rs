//! Cascading municipality → zone selection over the loaded dataset.
//!
//! Option lists are always derived from the records themselves, so a selection
//! made from them can never reference a value that does not exist.

use crate::data::Dataset;
use crate::types::{SectionRecord, Selection};
use anyhow::{bail, Result};
use std::collections::HashSet;

/// Distinct municipalities in order of first appearance.
pub fn list_municipalities(dataset: &Dataset) -> Vec<String> {
    distinct(dataset.records().iter().map(|r| r.municipality.as_str()))
}

/// Distinct zones in order of first appearance, restricted to the selected municipality.
pub fn list_zones(dataset: &Dataset, municipality: &Selection) -> Vec<String> {
    distinct(
        dataset.records().iter()
            .filter(|r| municipality.matches(&r.municipality))
            .map(|r| r.zone.as_str()),
    )
}

/// Records matching both selections. `All` on both sides returns every record.
pub fn filter<'a>(
    dataset: &'a Dataset,
    municipality: &Selection,
    zone: &Selection,
) -> Vec<&'a SectionRecord> {
    dataset.records().iter()
        .filter(|r| municipality.matches(&r.municipality) && zone.matches(&r.zone))
        .collect()
}

/// Rejects selector values that no record carries.
///
/// A known municipality and a known zone that never occur together are
/// accepted: they select nothing and render the zero state.
pub fn check_selection(dataset: &Dataset, municipality: &Selection, zone: &Selection) -> Result<()> {
    if let Selection::Only(m) = municipality {
        if !dataset.records().iter().any(|r| &r.municipality == m) {
            bail!("Unknown municipality {:?}", m);
        }
    }
    if let Selection::Only(z) = zone {
        if !dataset.records().iter().any(|r| &r.zone == z) {
            bail!("Unknown zone {:?}", z);
        }
    }
    Ok(())
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}
