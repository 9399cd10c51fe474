use crate::config::{AppConfig, ColumnConfig};
use crate::types::SectionRecord;
use anyhow::{Context, Result, anyhow, bail};
use geo::Point;
use geojson::GeoJson;
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The full, read-only record set. Loaded once and shared by every request.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<SectionRecord>,
}

impl Dataset {
    pub fn new(records: Vec<SectionRecord>) -> Self {
        Dataset { records }
    }

    pub fn records(&self) -> &[SectionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn load_data(config: &AppConfig) -> Result<Dataset> {
    let path = &config.input.dataset;
    tracing::info!("Loading sections from {:?}...", path);

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input dataset has no extension"))?;

    let records = match extension.as_str() {
        "shp" => load_shapefile(path, &config.input.columns)?,
        "json" | "geojson" => load_geojson(path, &config.input.columns)?,
        _ => return Err(anyhow!("Unsupported dataset format: {}", extension)),
    };

    let total: u64 = records.iter().map(|r| r.votes).sum();
    tracing::info!("Loaded {} sections ({} votes)", records.len(), total);

    Ok(Dataset::new(records))
}

fn load_shapefile(path: &Path, columns: &ColumnConfig) -> Result<Vec<SectionRecord>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut records = Vec::new();

    for (row, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.with_context(|| format!("Failed to read shape #{}", row))?;

        let location = shape_point(shape).with_context(|| format!("Shape #{}", row))?;

        let field = |name: &str| {
            record.get(name)
                .ok_or_else(|| anyhow!("Column '{}' not found in Shapefile", name))
        };

        let municipality = dbase_text(field(&columns.municipality)?)
            .with_context(|| format!("Shape #{}: column '{}'", row, columns.municipality))?;
        let zone = dbase_text(field(&columns.zone)?)
            .with_context(|| format!("Shape #{}: column '{}'", row, columns.zone))?;
        let section = dbase_text(field(&columns.section)?)
            .with_context(|| format!("Shape #{}: column '{}'", row, columns.section))?;
        // Address is display-only, a blank one is tolerated
        let address = record.get(&columns.address)
            .and_then(|v| dbase_text(v).ok())
            .unwrap_or_default();
        let votes = dbase_votes(field(&columns.votes)?)
            .with_context(|| format!("Shape #{}: column '{}'", row, columns.votes))?;

        records.push(SectionRecord { municipality, zone, section, address, votes, location });
    }

    Ok(records)
}

fn shape_point(shape: Shape) -> Result<Point<f64>> {
    match shape {
        Shape::Point(p) => Ok(Point::new(p.x, p.y)),
        Shape::PointM(p) => Ok(Point::new(p.x, p.y)),
        Shape::PointZ(p) => Ok(Point::new(p.x, p.y)),
        other => bail!("{:?} is not a point", other.shapetype()),
    }
}

fn dbase_text(value: &FieldValue) -> Result<String> {
    match value {
        FieldValue::Character(Some(s)) => Ok(s.trim().to_string()),
        FieldValue::Memo(s) => Ok(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Ok(number_text(*n)),
        FieldValue::Double(n) => Ok(number_text(*n)),
        FieldValue::Float(Some(n)) => Ok(number_text(f64::from(*n))),
        FieldValue::Integer(n) => Ok(n.to_string()),
        FieldValue::Character(None) | FieldValue::Numeric(None) | FieldValue::Float(None) => {
            Err(anyhow!("value is null"))
        }
        other => Err(anyhow!("unsupported field type: {:?}", other)),
    }
}

fn dbase_votes(value: &FieldValue) -> Result<u64> {
    match value {
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) => votes_from_f64(*n),
        FieldValue::Float(Some(n)) => votes_from_f64(f64::from(*n)),
        FieldValue::Integer(n) => {
            u64::try_from(*n).map_err(|_| anyhow!("negative vote count: {}", n))
        }
        FieldValue::Character(Some(s)) => votes_from_str(s),
        other => Err(anyhow!("not a vote count: {:?}", other)),
    }
}

fn load_geojson(path: &Path, columns: &ColumnConfig) -> Result<Vec<SectionRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Whole collection is parsed in one go; datasets are a few thousand points.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;
    records_from_geojson(geojson, columns)
}

pub fn records_from_geojson(geojson: GeoJson, columns: &ColumnConfig) -> Result<Vec<SectionRecord>> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut records = Vec::with_capacity(collection.features.len());

    for (row, feature) in collection.features.into_iter().enumerate() {
        let geometry = feature.geometry
            .ok_or_else(|| anyhow!("Feature #{} has no geometry", row))?;
        let geometry: geo::Geometry<f64> = geometry.value.try_into()
            .map_err(|e| anyhow!("Failed to convert geometry of feature #{}: {:?}", row, e))?;
        let location = match geometry {
            geo::Geometry::Point(p) => p,
            _ => bail!("Feature #{} is not a point", row),
        };

        let props = feature.properties.unwrap_or_default();
        let field = |name: &str| {
            props.get(name)
                .ok_or_else(|| anyhow!("Column '{}' not found in feature #{}", name, row))
        };

        let municipality = json_text(field(&columns.municipality)?)
            .with_context(|| format!("Feature #{}: column '{}'", row, columns.municipality))?;
        let zone = json_text(field(&columns.zone)?)
            .with_context(|| format!("Feature #{}: column '{}'", row, columns.zone))?;
        let section = json_text(field(&columns.section)?)
            .with_context(|| format!("Feature #{}: column '{}'", row, columns.section))?;
        let address = props.get(&columns.address)
            .and_then(|v| json_text(v).ok())
            .unwrap_or_default();
        let votes = json_votes(field(&columns.votes)?)
            .with_context(|| format!("Feature #{}: column '{}'", row, columns.votes))?;

        records.push(SectionRecord { municipality, zone, section, address, votes, location });
    }

    Ok(records)
}

fn json_text(value: &serde_json::Value) -> Result<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i.to_string()),
            None => Ok(number_text(n.as_f64().unwrap_or_default())),
        },
        serde_json::Value::Null => Err(anyhow!("value is null")),
        other => Err(anyhow!("expected text or number, got {}", other)),
    }
}

fn json_votes(value: &serde_json::Value) -> Result<u64> {
    match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(v) => Ok(v),
            None => votes_from_f64(n.as_f64().unwrap_or(-1.0)),
        },
        serde_json::Value::String(s) => votes_from_str(s),
        other => Err(anyhow!("not a vote count: {}", other)),
    }
}

// Integral floats (as written by dBase/pandas) print without the fraction: 12.0 -> "12"
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn votes_from_f64(n: f64) -> Result<u64> {
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
        bail!("invalid vote count: {}", n);
    }
    Ok(n as u64)
}

fn votes_from_str(s: &str) -> Result<u64> {
    s.trim().parse::<u64>()
        .with_context(|| format!("invalid vote count: {:?}", s))
}
