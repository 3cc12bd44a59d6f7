use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "par-config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParConfig {
    pub report: ReportConfig,
    pub source: SourceConfig,
    pub tables: TableNames,
    pub sections: SectionToggles,
    pub publications: PublicationsConfig,
    pub bundle: BundleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Defaults to the current calendar year.
    pub year: i32,
    /// Raw LaTeX, written into `\parperson` unescaped.
    pub person: String,
    pub style_package: String,
    pub output_dir: String,
    pub tex_filename: String,
    pub bib_prefix: String,
    pub bib_style: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            year: chrono::Local::now().year(),
            person: "Paul P.\\ H.\\ Wilson".to_string(),
            style_package: "ep_par".to_string(),
            output_dir: "./output".to_string(),
            tex_filename: "par.tex".to_string(),
            bib_prefix: "par".to_string(),
            bib_style: "plain".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    GoogleSheets,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub r#type: SourceType,
    pub spreadsheet_name: String,
    pub spreadsheet_id: Option<String>,
    pub credentials_file: String,
    pub csv_dir: String,
    pub sheets_api_base: String,
    pub drive_api_base: String,
    /// Overrides the key file's `token_uri`.
    pub token_uri: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            r#type: SourceType::GoogleSheets,
            spreadsheet_name: "PAR Data".to_string(),
            spreadsheet_id: None,
            credentials_file: "ep-par-processing.json".to_string(),
            csv_dir: "./data".to_string(),
            sheets_api_base: "https://sheets.googleapis.com".to_string(),
            drive_api_base: "https://www.googleapis.com".to_string(),
            token_uri: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub course_info: String,
    pub course_history: String,
    pub course_development: String,
    pub advisees: String,
    pub employers: String,
    pub publications: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            course_info: "CourseInfo".to_string(),
            course_history: "CourseHistory".to_string(),
            course_development: "CourseDevelopment".to_string(),
            advisees: "AdviseeList".to_string(),
            employers: "EmployerList".to_string(),
            publications: "Publications".to_string(),
        }
    }
}

impl TableNames {
    /// 必要的表格，缺少時中止
    pub fn required(&self) -> Vec<&str> {
        vec![
            self.course_info.as_str(),
            self.course_history.as_str(),
            self.course_development.as_str(),
            self.advisees.as_str(),
            self.employers.as_str(),
        ]
    }

    pub fn optional(&self) -> Vec<&str> {
        vec![self.publications.as_str()]
    }

    pub fn all(&self) -> Vec<&str> {
        let mut names = self.required();
        names.extend(self.optional());
        names
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionToggles {
    pub course_list: bool,
    pub future_courses: bool,
    pub course_development: bool,
    pub advising: bool,
    pub publications: bool,
}

impl Default for SectionToggles {
    fn default() -> Self {
        Self {
            course_list: true,
            future_courses: true,
            course_development: true,
            advising: true,
            publications: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationsConfig {
    pub current_year_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub enabled: bool,
    pub filename: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: "par_bundle.zip".to_string(),
        }
    }
}

impl ParConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 載入預設配置檔；檔案不存在時使用內建預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(
                "No config file at {}, using built-in defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PAR_SPREADSHEET_ID})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_range("report.year", self.report.year, 1900, 2100)?;
        validation::validate_non_empty_string("report.person", &self.report.person)?;
        validation::validate_non_empty_string("report.style_package", &self.report.style_package)?;
        validation::validate_path("report.output_dir", &self.report.output_dir)?;
        validation::validate_file_extension("report.tex_filename", &self.report.tex_filename, "tex")?;
        validation::validate_non_empty_string("report.bib_prefix", &self.report.bib_prefix)?;
        validation::validate_non_empty_string("report.bib_style", &self.report.bib_style)?;

        match self.source.r#type {
            SourceType::GoogleSheets => {
                validation::validate_path("source.credentials_file", &self.source.credentials_file)?;
                validation::validate_url("source.sheets_api_base", &self.source.sheets_api_base)?;
                if let Some(id) = &self.source.spreadsheet_id {
                    validation::validate_non_empty_string("source.spreadsheet_id", id)?;
                } else {
                    // 沒有 id 時必須能用名稱查詢
                    if self.source.spreadsheet_name.trim().is_empty() {
                        return Err(EtlError::MissingConfigError {
                            field: "source.spreadsheet_id".to_string(),
                        });
                    }
                    validation::validate_url("source.drive_api_base", &self.source.drive_api_base)?;
                }
                if let Some(token_uri) = &self.source.token_uri {
                    validation::validate_url("source.token_uri", token_uri)?;
                }
                validation::validate_positive_number(
                    "source.timeout_seconds",
                    self.source.timeout_seconds,
                    1,
                )?;
            }
            SourceType::Csv => {
                validation::validate_path("source.csv_dir", &self.source.csv_dir)?;
            }
        }

        for name in self.tables.all() {
            validation::validate_non_empty_string("tables", name)?;
        }
        validation::validate_distinct("tables", &self.tables.all())?;

        if self.bundle.enabled {
            validation::validate_file_extension("bundle.filename", &self.bundle.filename, "zip")?;
        }

        Ok(())
    }

    pub fn output_path(&self) -> &str {
        &self.report.output_dir
    }

    pub fn tex_path(&self) -> String {
        format!("{}/{}", self.report.output_dir, self.report.tex_filename)
    }
}

impl Validate for ParConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
