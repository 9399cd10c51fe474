pub mod types;
pub mod config;
pub mod data;
pub mod filter;
pub mod aggregate;
pub mod dashboard;
pub mod render;
pub mod server;
pub mod export;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::dashboard::{thousands, DashboardView};
use crate::types::{GroupTotal, Selection};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print totals and rankings for one selection
    Summary {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Write the selected sections to a CSV file
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Municipality, or "Todos"
    #[arg(short, long)]
    municipio: Option<String>,
    /// Zone, or "Todas"
    #[arg(short, long)]
    zona: Option<String>,
}

impl SelectionArgs {
    fn selections(&self) -> (Selection, Selection) {
        (
            Selection::municipality(self.municipio.as_deref()),
            Selection::zone(self.zona.as_deref()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            tracing::info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            server::start_server(app_config, dataset).await?;
        }
        Commands::Summary { config, selection } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            let (municipality, zone) = selection.selections();
            filter::check_selection(&dataset, &municipality, &zone)?;
            let view = DashboardView::build(&dataset, &app_config.report, municipality, zone);
            print_summary(&view);
        }
        Commands::Export { config, output, selection } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;

            let (municipality, zone) = selection.selections();
            filter::check_selection(&dataset, &municipality, &zone)?;
            let view = DashboardView::build(&dataset, &app_config.report, municipality, zone);
            export::export_csv(output, &view.points)?;
        }
    }

    Ok(())
}

fn print_summary(view: &DashboardView) {
    println!(
        "Município: {}  Zona: {}",
        view.municipality.as_deref().unwrap_or(types::ALL_MUNICIPALITIES),
        view.zone.as_deref().unwrap_or(types::ALL_ZONES)
    );
    println!("{}", view.total_votes_text());
    println!();
    print_table("Municípios com mais votos", &view.top_municipalities);
    print_table("Zonas com mais votos", &view.top_zones);
    println!("{}", view.section_sentence);
    println!("{}", view.zone_sentence);
}

fn print_table(title: &str, rows: &[GroupTotal]) {
    println!("{}", title);
    let width = rows.iter().map(|r| r.key.chars().count()).max().unwrap_or(0);
    for (rank, row) in rows.iter().enumerate() {
        println!("{:>3}. {:<width$}  {:>9}", rank + 1, row.key, thousands(row.votes), width = width);
    }
    println!();
}
