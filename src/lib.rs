pub mod config;
pub mod error;
pub mod invoice;
pub mod report;

pub use config::{Columns, Config, Source};
pub use error::{MergeError, Result};
pub use invoice::{
    classify_payment_status, group_and_sum, merge, parse, summarize, InvoiceLine, InvoiceSummary,
    PaymentStatus, SummaryStats,
};
pub use report::{stage_csv, stage_summary_json, write_csv, write_summary_json, StagedFile};
