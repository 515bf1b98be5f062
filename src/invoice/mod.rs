mod line;
mod stats;
mod summary;

pub use line::{parse, InvoiceLine, InvoiceLines};
pub use stats::{summarize, SummaryStats, Tally};
pub use summary::{
    classify_payment_status, compare_invoice_numbers, group_and_sum, merge, InvoiceKey,
    InvoiceSummary, PaymentStatus,
};

use indexmap::IndexSet;

use crate::config::{Columns, Source};
use crate::error::Result;

/// What was read from one source
#[derive(Debug, Clone)]
pub struct SourceCount {
    pub source: Source,
    pub lines: usize,
    pub invoices: usize,
}

/// Merged invoices of a run, highest invoice number first
#[derive(Debug, Clone)]
pub struct Batch {
    pub sources: Vec<SourceCount>,
    pub invoices: Vec<InvoiceSummary>,
}

/// Read every source in order, then group, sum and sort all of their lines.
pub fn combine(sources: &[Source], columns: &Columns) -> Result<Batch> {
    let mut counts = Vec::with_capacity(sources.len());
    let mut all_lines = Vec::new();

    for source in sources {
        tracing::info!(path = %source.path.display(), currency = %source.currency, "reading invoice details");

        let lines = parse(&source.path, &source.currency, columns)?.collect::<Result<Vec<_>>>()?;
        let invoices = lines
            .iter()
            .map(|l| l.invoice_number.as_str())
            .collect::<IndexSet<_>>()
            .len();

        counts.push(SourceCount {
            source: source.clone(),
            lines: lines.len(),
            invoices,
        });
        tracing::debug!(lines = lines.len(), invoices, "parsed");

        all_lines.extend(lines);
    }

    let groups = group_and_sum(all_lines)?;
    Ok(Batch {
        sources: counts,
        invoices: merge([groups.into_values()]),
    })
}
