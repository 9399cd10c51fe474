//! One pass of the pipeline: filter → aggregate.
//!
//! Everything the page, the JSON API and the `summary` command show is taken
//! from a [`DashboardView`].

use crate::aggregate::{count_distinct, sum_votes_by, top_n, total_votes};
use crate::config::ReportConfig;
use crate::data::Dataset;
use crate::filter::{filter, list_municipalities, list_zones};
use crate::types::{GroupKey, GroupTotal, MapPoint, Selection};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub municipality: Option<String>,
    pub zone: Option<String>,
    pub municipality_options: Vec<String>,
    pub zone_options: Vec<String>,
    #[serde(skip)]
    pub points: Vec<MapPoint>,
    pub total_votes: u64,
    pub section_count: usize,
    pub zone_count: usize,
    pub state_sections: usize,
    pub state_zones: usize,
    /// Ranked over the full dataset, independent of the selection.
    pub top_municipalities: Vec<GroupTotal>,
    /// Ranked over the full dataset; keys are labelled "Zona <id>".
    pub top_zones: Vec<GroupTotal>,
    pub section_sentence: String,
    pub zone_sentence: String,
}

impl DashboardView {
    pub fn build(
        dataset: &Dataset,
        report: &ReportConfig,
        municipality: Selection,
        zone: Selection,
    ) -> Self {
        let filtered = filter(dataset, &municipality, &zone);

        let section_count = count_distinct(filtered.iter().copied(), GroupKey::Section);
        let zone_count = count_distinct(filtered.iter().copied(), GroupKey::Zone);

        let top_municipalities = top_n(
            &sum_votes_by(dataset.records(), GroupKey::Municipality),
            report.top_n,
        );
        let top_zones = top_n(&sum_votes_by(dataset.records(), GroupKey::Zone), report.top_n)
            .into_iter()
            .map(|g| GroupTotal { key: zone_label(&g.key), votes: g.votes })
            .collect();

        DashboardView {
            municipality: municipality.as_option().map(str::to_string),
            zone: zone.as_option().map(str::to_string),
            municipality_options: list_municipalities(dataset),
            zone_options: list_zones(dataset, &municipality),
            total_votes: total_votes(filtered.iter().copied()),
            points: filtered.iter().map(|r| MapPoint::from(*r)).collect(),
            section_count,
            zone_count,
            state_sections: report.state_sections,
            state_zones: report.state_zones,
            top_municipalities,
            top_zones,
            section_sentence: format!(
                "{} teve votos em {} seções eleitorais, de {} no Estado.",
                report.candidate, section_count, report.state_sections
            ),
            zone_sentence: format!(
                "Presença em {} Zonas de votação de {} no Estado.",
                zone_count, report.state_zones
            ),
        }
    }

    pub fn total_votes_text(&self) -> String {
        format!("Total de votos: {}", thousands(self.total_votes))
    }
}

pub fn zone_label(zone: &str) -> String {
    format!("Zona {}", zone)
}

/// `1234567` → `"1,234,567"`
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
