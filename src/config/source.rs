use std::path::{Path, PathBuf};

use super::Config;
use crate::error::{MergeError, Result};

/// Inputs used when none are given on the command line or in the config
pub const DEFAULT_INPUTS: [&str; 2] = ["invoice_details_EUR.csv", "invoice_details_USD.csv"];

/// An invoice details export and the currency all of its rows are billed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub path: PathBuf,
    pub currency: String,
}

impl Source {
    pub fn new(path: impl Into<PathBuf>, currency: &str) -> Self {
        Self {
            path: path.into(),
            currency: currency.trim().to_ascii_uppercase(),
        }
    }
}

fn is_currency_code(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// Currency implied by a file name like `invoice_details_EUR.csv`.
///
/// The token must be written in upper case so that names like `inv.csv` or
/// `old-data.csv` are not mistaken for a currency.
fn currency_from_file_name(path: &Path) -> Option<&str> {
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit(|c: char| matches!(c, '_' | '-' | '.'))
        .next()
        .filter(|token| token.len() == 3 && token.chars().all(|c| c.is_ascii_uppercase()))
}

/// Resolve a single path to a source: config mapping first, then the file name.
fn resolve_path(path: PathBuf, config: &Config) -> Result<Source> {
    if let Some(currency) = config.sources.get(&path) {
        tracing::debug!(path = %path.display(), %currency, "currency from config");
        return Ok(Source::new(path, currency));
    }

    match currency_from_file_name(&path) {
        Some(currency) => {
            tracing::debug!(path = %path.display(), %currency, "currency from file name");
            let currency = currency.to_string();
            Ok(Source::new(path, &currency))
        }
        None => Err(MergeError::UnknownCurrency(path)),
    }
}

/// Parse an input argument of the form `PATH` or `CUR=PATH`
fn parse_source_arg(arg: &str, config: &Config) -> Result<Source> {
    if let Some((left, right)) = arg.split_once('=') {
        if left.is_empty() || right.is_empty() {
            return Err(MergeError::InvalidSource(arg.to_string()));
        }
        if is_currency_code(left) {
            return Ok(Source::new(right, left));
        }
    }
    resolve_path(PathBuf::from(arg), config)
}

/// Build the ordered list of sources for a run.
///
/// CLI arguments win over `[sources]` in the config, which wins over the
/// built-in default file names.
pub fn resolve_sources(args: &[String], config: &Config) -> Result<Vec<Source>> {
    if !args.is_empty() {
        return args
            .iter()
            .map(|arg| parse_source_arg(arg, config))
            .collect();
    }

    if !config.sources.is_empty() {
        return Ok(config
            .sources
            .iter()
            .map(|(path, currency)| Source::new(path.clone(), currency))
            .collect());
    }

    DEFAULT_INPUTS
        .iter()
        .map(|name| resolve_path(PathBuf::from(name), config))
        .collect()
}
