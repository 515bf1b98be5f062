use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Columns;
use crate::error::{MergeError, Result};

/// One line item of an invoice details export
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub client: String,
    pub invoice_number: String,
    pub issued_date: String,
    pub amount_pre_tax: Decimal,
    pub tax_1: Decimal,
    pub tax_2: Decimal,
    /// Empty when unpaid
    pub date_paid: String,
    pub currency: String,
    /// Export the line was read from
    pub path: Arc<Path>,
    /// 1-based line in the source file
    pub line: u64,
}

/// Positions of the consumed columns within a header row
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    client: usize,
    invoice_number: usize,
    issued_date: usize,
    amount_pre_tax: usize,
    tax_1: Option<usize>,
    tax_2: Option<usize>,
    date_paid: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord, columns: &Columns, path: &Path) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| MergeError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
        };

        Ok(Self {
            client: require(&columns.client)?,
            invoice_number: require(&columns.invoice_number)?,
            issued_date: require(&columns.issued_date)?,
            amount_pre_tax: require(&columns.amount_pre_tax)?,
            tax_1: find(&columns.tax_1),
            tax_2: find(&columns.tax_2),
            date_paid: require(&columns.date_paid)?,
        })
    }
}

/// Lazy sequence of invoice lines read from one export
pub struct InvoiceLines<R> {
    path: Arc<Path>,
    currency: String,
    columns: Columns,
    index: ColumnIndex,
    records: StringRecordsIntoIter<R>,
}

/// Open an invoice details CSV and read its header row.
///
/// Every line produced is tagged with `currency`.
pub fn parse(path: &Path, currency: &str, columns: &Columns) -> Result<InvoiceLines<File>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => MergeError::InputNotFound(path.to_path_buf()),
        _ => MergeError::InputOpen {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    InvoiceLines::from_reader(file, path, currency, columns)
}

impl<R: Read> InvoiceLines<R> {
    /// `path` only names the source in error messages.
    pub fn from_reader(reader: R, path: &Path, currency: &str, columns: &Columns) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| MergeError::InputUnreadable {
                path: path.to_path_buf(),
                source: e,
            })?
            .clone();
        let index = ColumnIndex::from_headers(&headers, columns, path)?;

        Ok(Self {
            path: Arc::from(path),
            currency: currency.to_string(),
            columns: columns.clone(),
            index,
            records: rdr.into_records(),
        })
    }

    fn line_from_record(&self, record: &StringRecord) -> Result<InvoiceLine> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let invoice_number = cell(self.index.invoice_number);
        if invoice_number.is_empty() {
            return Err(MergeError::MissingInvoiceNumber {
                path: self.path.to_path_buf(),
                line,
                column: self.columns.invoice_number.clone(),
            });
        }

        let amount = |idx: usize, column: &str, required: bool| -> Result<Decimal> {
            let raw = cell(idx);
            if raw.is_empty() && !required {
                return Ok(Decimal::ZERO);
            }
            parse_amount(raw).ok_or_else(|| MergeError::InvalidAmount {
                path: self.path.to_path_buf(),
                line,
                column: column.to_string(),
                value: raw.to_string(),
            })
        };
        let optional = |idx: Option<usize>, column: &str| -> Result<Decimal> {
            match idx {
                Some(idx) => amount(idx, column, false),
                None => Ok(Decimal::ZERO),
            }
        };

        Ok(InvoiceLine {
            client: cell(self.index.client).to_string(),
            invoice_number: invoice_number.to_string(),
            issued_date: cell(self.index.issued_date).to_string(),
            amount_pre_tax: amount(self.index.amount_pre_tax, &self.columns.amount_pre_tax, true)?,
            tax_1: optional(self.index.tax_1, &self.columns.tax_1)?,
            tax_2: optional(self.index.tax_2, &self.columns.tax_2)?,
            date_paid: cell(self.index.date_paid).to_string(),
            currency: self.currency.clone(),
            path: Arc::clone(&self.path),
            line,
        })
    }
}

impl<R: Read> Iterator for InvoiceLines<R> {
    type Item = Result<InvoiceLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => {
                return Some(Err(MergeError::InputUnreadable {
                    path: self.path.to_path_buf(),
                    source: e,
                }))
            }
        };
        Some(self.line_from_record(&record))
    }
}

/// Parse a money cell such as `1,250.00` or `-12.5`.
///
/// Commas are only accepted as thousands separators in the integer part.
fn parse_amount(raw: &str) -> Option<Decimal> {
    if !raw.contains(',') {
        return Decimal::from_str(raw).ok();
    }

    let unsigned = raw
        .strip_prefix('-')
        .or_else(|| raw.strip_prefix('+'))
        .unwrap_or(raw);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if frac_part.contains(',') {
        return None;
    }

    let is_digits = |g: &str| g.chars().all(|c| c.is_ascii_digit());
    let mut groups = int_part.split(',');
    let lead = groups.next()?;
    let grouped = (1..=3).contains(&lead.len())
        && is_digits(lead)
        && groups.all(|g| g.len() == 3 && is_digits(g));
    if !grouped {
        return None;
    }

    Decimal::from_str(&raw.replace(',', "")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Client Name,Invoice #,Date Issued,Invoice Status,Date Paid,Item Name,Line Subtotal,Tax 1 Amount,Tax 2 Amount,Line Total,Currency\n";

    fn read(csv: &str) -> Result<Vec<InvoiceLine>> {
        InvoiceLines::from_reader(
            csv.as_bytes(),
            Path::new("test.csv"),
            "EUR",
            &Columns::default(),
        )?
        .collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn reads_lines_tagged_with_currency() {
        let csv = format!(
            "{HEADER}Acme,1002,2024-02-01,sent,,Consulting,100.00,10.00,,110.00,EUR\n\
             Acme,1002,2024-02-01,sent,,Support,50.00,5.00,0,55.00,EUR\n"
        );
        let lines = read(&csv).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].client, "Acme");
        assert_eq!(lines[0].invoice_number, "1002");
        assert_eq!(lines[0].amount_pre_tax, dec("100.00"));
        assert_eq!(lines[0].tax_1, dec("10.00"));
        assert_eq!(lines[0].tax_2, Decimal::ZERO);
        assert_eq!(lines[0].currency, "EUR");
        assert_eq!(lines[0].line, 2);
        assert_eq!(lines[1].line, 3);
        assert!(lines[1].date_paid.is_empty());
    }

    #[test]
    fn missing_tax_columns_default_to_zero() {
        let csv = "Client Name,Invoice #,Date Issued,Date Paid,Line Subtotal\n\
                   Acme,7,2024-01-01,2024-01-05,\"1,250.50\"\n";
        let lines = read(csv).unwrap();

        assert_eq!(lines[0].amount_pre_tax, dec("1250.50"));
        assert_eq!(lines[0].tax_1, Decimal::ZERO);
        assert_eq!(lines[0].tax_2, Decimal::ZERO);
        assert_eq!(lines[0].date_paid, "2024-01-05");
    }

    #[test]
    fn missing_required_column() {
        let csv = "Client Name,Date Issued,Date Paid,Line Subtotal\nAcme,2024-01-01,,1\n";
        match read(csv) {
            Err(MergeError::MissingColumn { column, .. }) => assert_eq!(column, "Invoice #"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_amount_names_line_and_column() {
        let csv = format!("{HEADER}Acme,1,2024-01-01,sent,,Item,abc,0,0,0,EUR\n");
        match read(&csv) {
            Err(MergeError::InvalidAmount {
                line,
                column,
                value,
                ..
            }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "Line Subtotal");
                assert_eq!(value, "abc");
            }
            other => panic!("expected invalid amount, got {other:?}"),
        }
    }

    #[test]
    fn empty_amount_is_rejected() {
        let csv = format!("{HEADER}Acme,1,2024-01-01,sent,,Item,,0,0,0,EUR\n");
        assert!(matches!(read(&csv), Err(MergeError::InvalidAmount { .. })));
    }

    #[test]
    fn blank_invoice_number_is_rejected() {
        let csv = format!("{HEADER}Acme, ,2024-01-01,sent,,Item,1,0,0,1,EUR\n");
        assert!(matches!(
            read(&csv),
            Err(MergeError::MissingInvoiceNumber { line: 2, .. })
        ));
    }

    #[test]
    fn byte_order_mark_in_header_is_ignored() {
        let csv = format!("\u{feff}{HEADER}Acme,1,2024-01-01,sent,,Item,1,0,0,1,EUR\n");
        assert_eq!(read(&csv).unwrap()[0].client, "Acme");
    }

    #[test]
    fn commas_only_as_thousands_separators() {
        assert_eq!(parse_amount("1,250.00"), Some(dec("1250.00")));
        assert_eq!(parse_amount("-1,234,567.5"), Some(dec("-1234567.5")));
        assert_eq!(parse_amount("12.5"), Some(dec("12.5")));
        assert_eq!(parse_amount("12,50"), None);
        assert_eq!(parse_amount("1,2345"), None);
        assert_eq!(parse_amount(",250"), None);
        assert_eq!(parse_amount("1.000,50"), None);
        assert_eq!(parse_amount("1,,000"), None);
    }

    #[test]
    fn decimal_comma_is_rejected() {
        let csv = format!("{HEADER}Acme,1,2024-01-01,sent,,Item,\"12,50\",0,0,0,EUR\n");
        match read(&csv) {
            Err(MergeError::InvalidAmount { value, .. }) => assert_eq!(value, "12,50"),
            other => panic!("expected invalid amount, got {other:?}"),
        }
    }

    #[test]
    fn lines_remember_their_source() {
        let csv = format!("{HEADER}Acme,1,2024-01-01,sent,,Item,1,0,0,1,EUR\n");
        assert_eq!(&*read(&csv).unwrap()[0].path, Path::new("test.csv"));
    }

    #[test]
    fn directory_as_input_names_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = parse(dir.path(), "EUR", &Columns::default())
            .and_then(|lines| lines.collect::<Result<Vec<_>>>().map(|_| ()))
            .unwrap_err();
        assert!(matches!(
            err,
            MergeError::InputOpen { .. } | MergeError::InputUnreadable { .. }
        ));
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[test]
    fn missing_file() {
        let err = parse(Path::new("/nonexistent/a.csv"), "EUR", &Columns::default())
            .err()
            .unwrap();
        assert!(matches!(err, MergeError::InputNotFound(_)));
    }
}
