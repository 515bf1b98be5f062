use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::summary::{InvoiceSummary, PaymentStatus};
use crate::error::{MergeError, Result};

/// Count and amount totals for one group of invoices
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Tally {
    pub count: usize,
    pub amount_pre_tax: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
}

impl Tally {
    /// Add one invoice; `None` when a total leaves the range of `Decimal`.
    fn add(&mut self, summary: &InvoiceSummary) -> Option<()> {
        let amount_pre_tax = self.amount_pre_tax.checked_add(summary.amount_pre_tax)?;
        let tax = self.tax.checked_add(summary.tax)?;
        let total_amount = self.total_amount.checked_add(summary.total_amount)?;

        self.count += 1;
        self.amount_pre_tax = amount_pre_tax;
        self.tax = tax;
        self.total_amount = total_amount;
        Some(())
    }
}

/// Totals over the merged invoices, grouped by currency and by payment status
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub invoices: usize,
    pub by_currency: BTreeMap<String, Tally>,
    pub by_status: BTreeMap<PaymentStatus, Tally>,
}

pub fn summarize(merged: &[InvoiceSummary]) -> Result<SummaryStats> {
    let mut stats = SummaryStats {
        invoices: merged.len(),
        ..Default::default()
    };

    for summary in merged {
        stats
            .by_currency
            .entry(summary.currency.clone())
            .or_default()
            .add(summary)
            .ok_or_else(|| MergeError::TotalOverflow {
                group: summary.currency.clone(),
            })?;
        stats
            .by_status
            .entry(summary.payment_status)
            .or_default()
            .add(summary)
            .ok_or_else(|| MergeError::TotalOverflow {
                group: summary.payment_status.to_string(),
            })?;
    }

    Ok(stats)
}
