pub mod cli;
pub mod toml_config;

pub use toml_config::{ParConfig, SourceType};

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "par-build")]
#[command(about = "Generate the Professional Activity Report LaTeX source from the PAR spreadsheet")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Report year
    #[arg(long)]
    pub year: Option<i32>,

    /// Name printed on the report (LaTeX)
    #[arg(long)]
    pub person: Option<String>,

    #[arg(long)]
    pub output_dir: Option<String>,

    /// Read tables from CSV exports in this directory instead of Google Sheets
    #[arg(long)]
    pub csv_dir: Option<String>,

    /// Service-account key file
    #[arg(long)]
    pub credentials: Option<String>,

    #[arg(long)]
    pub spreadsheet_id: Option<String>,

    /// Also write a zip bundle of the generated files
    #[arg(long)]
    pub bundle: bool,

    /// Dry run - show what would be generated without fetching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl CliArgs {
    /// 命令列參數覆蓋配置檔
    pub fn apply_to(&self, config: &mut ParConfig) {
        if let Some(year) = self.year {
            config.report.year = year;
        }
        if let Some(person) = &self.person {
            config.report.person = person.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.report.output_dir = output_dir.clone();
        }
        if let Some(csv_dir) = &self.csv_dir {
            config.source.r#type = SourceType::Csv;
            config.source.csv_dir = csv_dir.clone();
        }
        if let Some(credentials) = &self.credentials {
            config.source.credentials_file = credentials.clone();
        }
        if let Some(id) = &self.spreadsheet_id {
            config.source.spreadsheet_id = Some(id.clone());
        }
        if self.bundle {
            config.bundle.enabled = true;
        }
    }
}
