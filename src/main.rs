use clap::Parser;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use invoice_merge::config::{load_config, resolve_sources};
use invoice_merge::invoice::{combine, Batch, InvoiceSummary, SummaryStats};
use invoice_merge::report::{stage_csv, stage_summary_json};
use invoice_merge::{summarize, Result};

#[derive(Parser)]
#[command(name = "invoice-merge")]
#[command(
    version,
    about = "Merge per-currency invoice details exports into one summary CSV",
    long_about = None
)]
struct Cli {
    /// Invoice details exports as PATH or CUR=PATH (currency is taken from
    /// names like invoice_details_EUR.csv when omitted)
    #[arg(value_name = "INPUT")]
    inputs: Vec<String>,

    /// Output CSV path (default: combined_invoices.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to config file (default: XDG config dir, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write summary statistics as JSON to this path
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Number of invoices to show in the preview (default: 5)
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// Do not print the summary
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let sources = resolve_sources(&cli.inputs, &config)?;
    let output = cli.output.unwrap_or_else(|| config.output());
    let preview = cli.preview.unwrap_or_else(|| config.preview());

    let batch = combine(&sources, &config.columns)?;
    let stats = summarize(&batch.invoices)?;

    // Both outputs are staged before either is committed; the CSV goes last
    let csv = stage_csv(&batch.invoices, &output)?;
    let summary = match &cli.summary {
        Some(path) => Some(stage_summary_json(&stats, path)?),
        None => None,
    };
    if let Some(summary) = summary {
        summary.commit()?;
    }
    csv.commit()?;
    tracing::info!(path = %output.display(), rows = batch.invoices.len(), "wrote merged invoices");

    if !cli.quiet {
        print_summary(&batch, &stats, &output, preview);
    }

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct TallyRow {
    #[tabled(rename = "GROUP")]
    group: String,
    #[tabled(rename = "COUNT")]
    count: usize,
    #[tabled(rename = "TOTAL")]
    total: String,
}

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "ISSUED")]
    issued: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "CURRENCY")]
    currency: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Format a money amount with two decimal places and thousands separators
fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let whole = rounded.trunc();
    let cents = ((rounded - whole).abs() * Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or(0);

    let grouped = match whole.to_i64() {
        Some(w) => format_grouped_int(w),
        None => whole.to_string(),
    };
    let sign = if rounded.is_sign_negative() && whole.is_zero() && cents > 0 {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{cents:02}")
}

fn tally_table<K: ToString>(groups: impl IntoIterator<Item = (K, usize, Decimal)>) -> String {
    let rows: Vec<TallyRow> = groups
        .into_iter()
        .map(|(key, count, total)| TallyRow {
            group: key.to_string(),
            count,
            total: format_amount(total),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

fn print_summary(batch: &Batch, stats: &SummaryStats, output: &Path, preview: usize) {
    for count in &batch.sources {
        println!(
            "Read {}: {} {} invoices ({} lines)",
            count.source.path.display(),
            count.invoices,
            count.source.currency,
            count.lines
        );
    }
    println!(
        "Combined {} invoices saved to {}",
        batch.invoices.len(),
        output.display()
    );

    if batch.invoices.is_empty() {
        return;
    }

    println!();
    println!("By currency:");
    println!(
        "{}",
        tally_table(
            stats
                .by_currency
                .iter()
                .map(|(currency, t)| (currency, t.count, t.total_amount))
        )
    );

    println!();
    println!("By status:");
    println!(
        "{}",
        tally_table(
            stats
                .by_status
                .iter()
                .map(|(status, t)| (status, t.count, t.total_amount))
        )
    );

    if preview > 0 {
        println!();
        println!("First {} invoices:", preview.min(batch.invoices.len()));
        println!("{}", preview_table(&batch.invoices[..preview.min(batch.invoices.len())]));
    }
}

fn preview_table(invoices: &[InvoiceSummary]) -> String {
    let rows: Vec<PreviewRow> = invoices
        .iter()
        .map(|inv| PreviewRow {
            client: inv.client.clone(),
            number: inv.invoice_number.clone(),
            issued: inv.issued_date.clone(),
            total: format_amount(inv.total_amount),
            currency: inv.currency.clone(),
            status: inv.payment_status.to_string(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amounts_are_grouped_with_two_decimals() {
        let dec = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(format_amount(dec("1250")), "1,250.00");
        assert_eq!(format_amount(dec("1234567.5")), "1,234,567.50");
        assert_eq!(format_amount(dec("165.005")), "165.01");
        assert_eq!(format_amount(dec("-1250.25")), "-1,250.25");
        assert_eq!(format_amount(dec("-0.50")), "-0.50");
        assert_eq!(format_amount(dec("0")), "0.00");
    }
}
