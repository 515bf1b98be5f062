use indexmap::map::Entry;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use super::line::InvoiceLine;
use crate::error::{MergeError, Result};

/// Payment status derived from whether a paid date is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Unpaid => write!(f, "Unpaid"),
        }
    }
}

pub fn classify_payment_status(date_paid: &str) -> PaymentStatus {
    if date_paid.trim().is_empty() {
        PaymentStatus::Unpaid
    } else {
        PaymentStatus::Paid
    }
}

/// One invoice with all of its line items summed
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceSummary {
    pub client: String,
    pub invoice_number: String,
    pub issued_date: String,
    pub amount_pre_tax: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub date_paid: String,
}

fn overflow(line: &InvoiceLine) -> MergeError {
    MergeError::AmountOverflow {
        path: line.path.to_path_buf(),
        line: line.line,
        invoice: line.invoice_number.clone(),
    }
}

impl InvoiceSummary {
    fn from_line(line: InvoiceLine) -> Result<Self> {
        let tax = line
            .tax_1
            .checked_add(line.tax_2)
            .ok_or_else(|| overflow(&line))?;
        let total_amount = line
            .amount_pre_tax
            .checked_add(tax)
            .ok_or_else(|| overflow(&line))?;

        Ok(Self {
            payment_status: classify_payment_status(&line.date_paid),
            total_amount,
            amount_pre_tax: line.amount_pre_tax,
            tax,
            client: line.client,
            invoice_number: line.invoice_number,
            issued_date: line.issued_date,
            currency: line.currency,
            date_paid: line.date_paid,
        })
    }

    /// Fold another line of the same invoice into this summary.
    ///
    /// On overflow the summary is left unchanged.
    fn absorb(&mut self, line: InvoiceLine) -> Result<()> {
        if line.client != self.client || line.issued_date != self.issued_date {
            tracing::debug!(
                invoice = %self.invoice_number,
                currency = %self.currency,
                line = line.line,
                "line disagrees with first line on client or issue date, keeping first"
            );
        }

        let amount_pre_tax = self.amount_pre_tax.checked_add(line.amount_pre_tax);
        let tax = line
            .tax_1
            .checked_add(line.tax_2)
            .and_then(|t| self.tax.checked_add(t));
        let (amount_pre_tax, tax, total_amount) = amount_pre_tax
            .zip(tax)
            .and_then(|(a, t)| Some((a, t, a.checked_add(t)?)))
            .ok_or_else(|| overflow(&line))?;

        self.amount_pre_tax = amount_pre_tax;
        self.tax = tax;
        self.total_amount = total_amount;

        // Non-empty paid date wins
        if self.date_paid.is_empty() && !line.date_paid.is_empty() {
            self.date_paid = line.date_paid;
            self.payment_status = classify_payment_status(&self.date_paid);
        }
        Ok(())
    }
}

/// Identity of an invoice: (currency, invoice number)
pub type InvoiceKey = (String, String);

/// Collapse lines into one summary per (currency, invoice number).
///
/// Groups keep the order in which their first line appeared. Fails if a sum
/// leaves the range of `Decimal`.
pub fn group_and_sum<I>(lines: I) -> Result<IndexMap<InvoiceKey, InvoiceSummary>>
where
    I: IntoIterator<Item = InvoiceLine>,
{
    let mut groups: IndexMap<InvoiceKey, InvoiceSummary> = IndexMap::new();

    for line in lines {
        let key = (line.currency.clone(), line.invoice_number.clone());
        match groups.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().absorb(line)?,
            Entry::Vacant(entry) => {
                entry.insert(InvoiceSummary::from_line(line)?);
            }
        }
    }

    Ok(groups)
}

/// First run of ASCII digits with leading zeros removed
fn numeric_key(number: &str) -> Option<&str> {
    let start = number.find(|c: char| c.is_ascii_digit())?;
    let rest = &number[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(rest[..end].trim_start_matches('0'))
}

/// Ascending order of invoice numbers.
///
/// Numbers are compared by their first digit run as an integer of any length;
/// numbers with digits rank above those without. Equal digit runs fall back to
/// comparing the whole strings.
pub fn compare_invoice_numbers(a: &str, b: &str) -> Ordering {
    match (numeric_key(a), numeric_key(b)) {
        (Some(x), Some(y)) => x
            .len()
            .cmp(&y.len())
            .then_with(|| x.cmp(y))
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Concatenate summaries and sort them by invoice number, highest first.
///
/// The sort is stable: the same number in two currencies keeps input order.
pub fn merge<G, I>(groups: G) -> Vec<InvoiceSummary>
where
    G: IntoIterator<Item = I>,
    I: IntoIterator<Item = InvoiceSummary>,
{
    let mut merged: Vec<InvoiceSummary> = groups.into_iter().flatten().collect();
    merged.sort_by(|a, b| compare_invoice_numbers(&b.invoice_number, &a.invoice_number));
    merged
}
