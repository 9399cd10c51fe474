use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub dataset: PathBuf, // .shp or .geojson
    #[serde(default)]
    pub columns: ColumnConfig,
}

/// Attribute names as they appear in the dataset.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColumnConfig {
    pub municipality: String,
    pub zone: String,
    pub section: String,
    pub address: String,
    pub votes: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            municipality: "Municipio".to_string(),
            zone: "Zona".to_string(),
            section: "Seção".to_string(),
            address: "Endereço".to_string(),
            votes: "Votos".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub candidate: String,
    pub title: String,
    pub source_note: String,
    pub credits: String,
    pub top_n: usize,
    // State-wide reference counts quoted in the coverage sentences
    pub state_sections: usize,
    pub state_zones: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            candidate: "Wesley Teixeira".to_string(),
            title: "Votos de Wesley Teixeira por seção eleitoral em 2022".to_string(),
            source_note: "Os dados utilizados nesta análise foram obtidos no site do Tribunal \
                Superior Eleitoral (TSE). O TSE não disponibiliza os dados geográficos das \
                posições das seções; as localizações apresentadas são estimativas e podem \
                conter erros."
                .to_string(),
            credits: "Dados elaborados por Christian Basilio Oliveira.".to_string(),
            top_n: 10,
            state_sections: 952,
            state_zones: 165,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8501,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
