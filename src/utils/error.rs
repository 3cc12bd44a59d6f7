use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    ApiStatusError { status: u16, body: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Token signing error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Spreadsheet '{name}' not found")]
    SpreadsheetNotFound { name: String },

    #[error("Table '{table}' not found in the spreadsheet")]
    MissingTable { table: String },

    #[error("Table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("{table} row {row}, column {column}: invalid value '{value}' ({reason})")]
    InvalidCell {
        table: String,
        row: usize,
        column: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Configuration,
    Data,
    Io,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that failed with this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::ApiStatusError { .. } => ErrorCategory::Network,
            EtlError::AuthError { .. } | EtlError::JwtError(_) => ErrorCategory::Authentication,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::SpreadsheetNotFound { .. }
            | EtlError::MissingTable { .. }
            | EtlError::MissingColumn { .. }
            | EtlError::InvalidCell { .. }
            | EtlError::CsvError(_) => ErrorCategory::Data,
            EtlError::IoError(_) | EtlError::ZipError(_) => ErrorCategory::Io,
            EtlError::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常可以重試
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Internal => ErrorSeverity::High,
            ErrorCategory::Authentication
            | ErrorCategory::Configuration
            | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::ApiError(_) => {
                "Check the network connection and rerun the report".to_string()
            }
            EtlError::ApiStatusError { status, .. } if *status == 403 => {
                "Share the spreadsheet with the service account's client_email".to_string()
            }
            EtlError::ApiStatusError { .. } => {
                "Check the API base URLs and that the Sheets and Drive APIs are enabled".to_string()
            }
            EtlError::AuthError { .. } | EtlError::JwtError(_) => {
                "Check that the credentials file is a valid service-account key".to_string()
            }
            EtlError::SpreadsheetNotFound { .. } => {
                "Check source.spreadsheet_name or set source.spreadsheet_id".to_string()
            }
            EtlError::MissingTable { table } => {
                format!("Add a sheet named '{}' or fix the [tables] section", table)
            }
            EtlError::MissingColumn { table, column } => {
                format!("Add a '{}' header to the first row of '{}'", column, table)
            }
            EtlError::InvalidCell { table, row, .. } => {
                format!("Fix row {} of '{}' in the spreadsheet", row, table)
            }
            EtlError::CsvError(_) => "Re-export the CSV files from the spreadsheet".to_string(),
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Check par-config.toml and the command-line options".to_string()
            }
            EtlError::IoError(_) | EtlError::ZipError(_) => {
                "Check that the output directory is writable".to_string()
            }
            EtlError::SerializationError(_) => {
                "Rerun with --verbose and report the log".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the spreadsheet service: {}", self),
            ErrorCategory::Authentication => format!("Could not authenticate: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Spreadsheet data problem: {}", self),
            ErrorCategory::Io => format!("Could not write the report: {}", self),
            ErrorCategory::Internal => format!("Report generation failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
