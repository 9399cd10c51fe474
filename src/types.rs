use geo::Point;
use serde::Serialize;

/// One electoral section with the votes the tracked candidate received there.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub municipality: String,
    pub zone: String,
    pub section: String,
    pub address: String,
    pub votes: u64,
    // x = longitude, y = latitude; stored as read, no re-projection
    pub location: Point<f64>,
}

impl SectionRecord {
    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }
}

/// Flat row handed to the map and the export: the record plus its derived coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct MapPoint {
    #[serde(rename = "Zona")]
    pub zone: String,
    #[serde(rename = "Seção")]
    pub section: String,
    #[serde(rename = "Municipio")]
    pub municipality: String,
    #[serde(rename = "Endereço")]
    pub address: String,
    #[serde(rename = "Votos")]
    pub votes: u64,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&SectionRecord> for MapPoint {
    fn from(record: &SectionRecord) -> Self {
        MapPoint {
            zone: record.zone.clone(),
            section: record.section.clone(),
            municipality: record.municipality.clone(),
            address: record.address.clone(),
            votes: record.votes,
            latitude: record.latitude(),
            longitude: record.longitude(),
        }
    }
}

/// A selector value: either the "all" sentinel or one concrete option.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    /// Parses the municipality selector. Blank or "Todos" means all.
    pub fn municipality(raw: Option<&str>) -> Self {
        Self::parse(raw, ALL_MUNICIPALITIES)
    }

    /// Parses the zone selector. Blank or "Todas" means all.
    pub fn zone(raw: Option<&str>) -> Self {
        Self::parse(raw, ALL_ZONES)
    }

    fn parse(raw: Option<&str>, sentinel: &str) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Selection::All,
            Some(v) if v == sentinel => Selection::All,
            Some(v) => Selection::Only(v.to_string()),
        }
    }

    pub fn as_option(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Only(v) => Some(v.as_str()),
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(v) => v == value,
        }
    }
}

pub const ALL_MUNICIPALITIES: &str = "Todos";
pub const ALL_ZONES: &str = "Todas";

/// Attribute a record set can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Municipality,
    Zone,
    Section,
}

impl GroupKey {
    pub fn value_of<'a>(&self, record: &'a SectionRecord) -> &'a str {
        match self {
            GroupKey::Municipality => &record.municipality,
            GroupKey::Zone => &record.zone,
            GroupKey::Section => &record.section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub votes: u64,
}
