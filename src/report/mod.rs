use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{MergeError, Result};
use crate::invoice::{InvoiceSummary, SummaryStats};

/// Column order of the merged CSV
pub const CSV_HEADER: [&str; 9] = [
    "client",
    "invoice_number",
    "issued_date",
    "amount_pre_tax",
    "tax",
    "total_amount",
    "currency",
    "payment_status",
    "date_paid",
];

fn write_error(path: &Path) -> impl Fn(std::io::Error) -> MergeError + '_ {
    move |source| MergeError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Output written in full to a temporary file next to its destination.
///
/// Nothing appears at the destination until [`StagedFile::commit`]; dropping a
/// staged file removes the temporary file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the temporary file over the destination
    pub fn commit(self) -> Result<()> {
        let path = self.path;
        self.tmp
            .persist(&path)
            .map_err(|e| MergeError::Write {
                path: path.clone(),
                source: e.error,
            })?;
        Ok(())
    }
}

fn stage<F>(path: &Path, fill: F) -> Result<StagedFile>
where
    F: FnOnce(&mut NamedTempFile) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = NamedTempFile::new_in(&dir).map_err(write_error(path))?;
    fill(&mut tmp).map_err(write_error(path))?;
    tmp.as_file().sync_all().map_err(write_error(path))?;
    Ok(StagedFile {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Stage merged invoices as CSV, header first, in the order given
pub fn stage_csv(rows: &[InvoiceSummary], path: &Path) -> Result<StagedFile> {
    let staged = stage(path, |tmp| {
        let mut writer = csv::Writer::from_writer(tmp);
        writer.write_record(CSV_HEADER)?;
        for row in rows {
            let amount_pre_tax = row.amount_pre_tax.to_string();
            let tax = row.tax.to_string();
            let total_amount = row.total_amount.to_string();
            let payment_status = row.payment_status.to_string();
            writer.write_record([
                row.client.as_str(),
                row.invoice_number.as_str(),
                row.issued_date.as_str(),
                amount_pre_tax.as_str(),
                tax.as_str(),
                total_amount.as_str(),
                row.currency.as_str(),
                payment_status.as_str(),
                row.date_paid.as_str(),
            ])?;
        }
        writer.flush()
    })?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "staged merged invoices");
    Ok(staged)
}

/// Write merged invoices as CSV. Nothing is left at `path` on failure.
pub fn write_csv(rows: &[InvoiceSummary], path: &Path) -> Result<()> {
    stage_csv(rows, path)?.commit()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote merged invoices");
    Ok(())
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    stats: &'a SummaryStats,
}

/// Stage summary statistics as pretty-printed JSON
pub fn stage_summary_json(stats: &SummaryStats, path: &Path) -> Result<StagedFile> {
    let report = SummaryReport {
        generated_at: Utc::now(),
        stats,
    };
    let mut json = serde_json::to_vec_pretty(&report)?;
    json.push(b'\n');

    stage(path, |tmp| tmp.write_all(&json))
}

/// Write summary statistics as pretty-printed JSON
pub fn write_summary_json(stats: &SummaryStats, path: &Path) -> Result<()> {
    stage_summary_json(stats, path)?.commit()?;
    tracing::info!(path = %path.display(), "wrote summary report");
    Ok(())
}
