use serde::{Deserialize, Serialize};

/// Header names of the invoice details export
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Columns {
    pub client: String,
    pub invoice_number: String,
    pub issued_date: String,
    pub amount_pre_tax: String,
    pub tax_1: String,
    pub tax_2: String,
    pub date_paid: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            client: "Client Name".to_string(),
            invoice_number: "Invoice #".to_string(),
            issued_date: "Date Issued".to_string(),
            amount_pre_tax: "Line Subtotal".to_string(),
            tax_1: "Tax 1 Amount".to_string(),
            tax_2: "Tax 2 Amount".to_string(),
            date_paid: "Date Paid".to_string(),
        }
    }
}
