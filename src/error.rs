use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Failed to open {path}: {source}")]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Required column '{column}' missing from {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Invalid amount '{value}' in column '{column}' at {path}:{line}")]
    InvalidAmount {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("Amount overflow summing invoice '{invoice}' at {path}:{line}")]
    AmountOverflow {
        path: PathBuf,
        line: u64,
        invoice: String,
    },

    #[error("Amount overflow totalling {group} invoices")]
    TotalOverflow { group: String },

    #[error("Missing invoice number in column '{column}' at {path}:{line}")]
    MissingInvoiceNumber {
        path: PathBuf,
        line: u64,
        column: String,
    },

    #[error("Cannot determine currency for {0}. Pass it as CUR=PATH or map it under [sources] in the config file.")]
    UnknownCurrency(PathBuf),

    #[error("Invalid input '{0}'. Expected PATH or CUR=PATH (e.g., 'EUR=invoice_details.csv')")]
    InvalidSource(String),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MergeError>;
