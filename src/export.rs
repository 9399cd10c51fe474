use crate::types::MapPoint;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 7] = ["Municipio", "Zona", "Seção", "Endereço", "Votos", "latitude", "longitude"];

pub fn export_csv(path: &Path, points: &[MapPoint]) -> Result<()> {
    let writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    write_points(writer, points)?;
    tracing::info!("Wrote {} sections to {:?}", points.len(), path);
    Ok(())
}

fn write_points<W: Write>(mut writer: csv::Writer<W>, points: &[MapPoint]) -> Result<()> {
    writer.write_record(HEADER)?;
    for p in points {
        writer.write_record([
            p.municipality.as_str(),
            p.zone.as_str(),
            p.section.as_str(),
            p.address.as_str(),
            p.votes.to_string().as_str(),
            p.latitude.to_string().as_str(),
            p.longitude.to_string().as_str(),
        ])?;
    }
    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_quoted_rows() {
        let points = vec![MapPoint {
            zone: "128".into(),
            section: "41".into(),
            municipality: "DUQUE DE CAXIAS".into(),
            address: "RUA A, 10".into(),
            votes: 12,
            latitude: -22.76,
            longitude: -43.3,
        }];

        let mut buf = Vec::new();
        write_points(csv::Writer::from_writer(&mut buf), &points).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Municipio,Zona,Seção,Endereço,Votos,latitude,longitude"));
        assert_eq!(lines.next(), Some("DUQUE DE CAXIAS,128,41,\"RUA A, 10\",12,-22.76,-43.3"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_selection_writes_only_header() {
        let mut buf = Vec::new();
        write_points(csv::Writer::from_writer(&mut buf), &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
