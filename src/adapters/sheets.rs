use crate::adapters::auth::{ServiceAccountKey, TokenProvider};
use crate::config::toml_config::SourceConfig;
use crate::domain::model::Table;
use crate::domain::ports::TableSource;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// How the workbook is identified in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetRef {
    Id(String),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

/// Reads tables from a Google Sheets workbook with a service account.
pub struct GoogleSheetsSource {
    client: Client,
    tokens: TokenProvider,
    sheets_api_base: String,
    drive_api_base: String,
    spreadsheet: SpreadsheetRef,
    spreadsheet_id: OnceCell<String>,
}

impl GoogleSheetsSource {
    pub fn new(
        client: Client,
        tokens: TokenProvider,
        spreadsheet: SpreadsheetRef,
        sheets_api_base: &str,
        drive_api_base: &str,
    ) -> Self {
        Self {
            client,
            tokens,
            sheets_api_base: sheets_api_base.to_string(),
            drive_api_base: drive_api_base.to_string(),
            spreadsheet,
            spreadsheet_id: OnceCell::new(),
        }
    }

    /// 依照 `[source]` 設定建立：讀取金鑰檔並設定逾時
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let key = ServiceAccountKey::from_file(&config.credentials_file)?;
        let tokens = TokenProvider::new(client.clone(), key, config.token_uri.clone());

        let spreadsheet = match &config.spreadsheet_id {
            Some(id) => SpreadsheetRef::Id(id.clone()),
            None => SpreadsheetRef::Name(config.spreadsheet_name.clone()),
        };

        Ok(Self::new(
            client,
            tokens,
            spreadsheet,
            &config.sheets_api_base,
            &config.drive_api_base,
        ))
    }

    pub async fn spreadsheet_id(&self) -> Result<&str> {
        let id = self
            .spreadsheet_id
            .get_or_try_init(|| async {
                match &self.spreadsheet {
                    SpreadsheetRef::Id(id) => Ok(id.clone()),
                    SpreadsheetRef::Name(name) => self.find_spreadsheet_by_name(name).await,
                }
            })
            .await?;
        Ok(id.as_str())
    }

    async fn find_spreadsheet_by_name(&self, name: &str) -> Result<String> {
        let token = self.tokens.access_token().await?;
        let mut url = endpoint(&self.drive_api_base, &["drive", "v3", "files"])?;
        url.query_pairs_mut()
            .append_pair("q", &drive_query(name))
            .append_pair("fields", "files(id,name)")
            .append_pair("supportsAllDrives", "true")
            .append_pair("includeItemsFromAllDrives", "true");

        tracing::debug!("Looking up spreadsheet '{}' on Drive", name);
        let response = self.client.get(url).bearer_auth(&token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::ApiStatusError {
                status: status.as_u16(),
                body: response.text().await?,
            });
        }

        let listing: DriveFileList = response.json().await?;
        let mut matches = listing.files.into_iter().filter(|f| f.name == name);
        let first = matches.next().ok_or_else(|| EtlError::SpreadsheetNotFound {
            name: name.to_string(),
        })?;

        let others = matches.count();
        if others > 0 {
            tracing::warn!(
                "⚠️ {} spreadsheets are named '{}', using {}",
                others + 1,
                name,
                first.id
            );
        }

        tracing::info!("📄 Found spreadsheet '{}' ({})", name, first.id);
        Ok(first.id)
    }
}

#[async_trait]
impl TableSource for GoogleSheetsSource {
    async fn fetch_table(&self, name: &str) -> Result<Option<Table>> {
        let spreadsheet_id = self.spreadsheet_id().await?.to_string();
        let token = self.tokens.access_token().await?;

        let mut url = endpoint(
            &self.sheets_api_base,
            &["v4", "spreadsheets", &spreadsheet_id, "values", &a1_sheet_range(name)],
        )?;
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");

        tracing::debug!("Fetching sheet '{}'", name);
        let response = self.client.get(url).bearer_auth(&token).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(EtlError::SpreadsheetNotFound {
                name: spreadsheet_id,
            });
        }

        if !status.is_success() {
            let body = response.text().await?;
            // 不存在的 sheet 名稱會被當成無法解析的範圍
            if status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range") {
                tracing::debug!("Sheet '{}' does not exist", name);
                return Ok(None);
            }
            return Err(EtlError::ApiStatusError {
                status: status.as_u16(),
                body,
            });
        }

        let range: ValueRange = response.json().await?;
        let cells: Vec<Vec<String>> = range
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        Ok(Some(Table::from_cells(name, cells)))
    }

    fn describe(&self) -> String {
        match &self.spreadsheet {
            SpreadsheetRef::Id(id) => {
                format!("Google Sheets spreadsheet {} as {}", id, self.tokens.client_email())
            }
            SpreadsheetRef::Name(name) => {
                format!("Google Sheets spreadsheet '{}' as {}", name, self.tokens.client_email())
            }
        }
    }
}

/// A1 range covering a whole sheet. Quoted so names like `2017!Q1` or
/// `A1` are not read as cell references.
fn a1_sheet_range(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| EtlError::InvalidConfigValueError {
        field: "api base".to_string(),
        value: base.to_string(),
        reason: e.to_string(),
    })?;

    url.path_segments_mut()
        .map_err(|_| EtlError::InvalidConfigValueError {
            field: "api base".to_string(),
            value: base.to_string(),
            reason: "URL cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

fn drive_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME_TYPE
    )
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        other => other.to_string(),
    }
}
