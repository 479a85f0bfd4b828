use std::io::Write;

use anyhow::Result;

use crate::application::{LedgerService, SpendingReport, StatementReport, TransactionFilter};
use crate::domain::format_cents;

/// Exporter for converting ledger data to CSV and JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export transactions to CSV, in the same column layout the importer reads.
    pub async fn export_transactions_csv<W: Write>(
        &self,
        filter: TransactionFilter,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.service.list_transactions(filter).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "code",
            "account_code",
            "date",
            "description",
            "value",
            "category_code",
            "type",
        ])?;

        for transaction in &transactions {
            csv_writer.write_record([
                transaction.code.as_str(),
                transaction.account_code.as_str(),
                transaction.date.to_string().as_str(),
                transaction.description.as_str(),
                format_cents(transaction.value).as_str(),
                transaction.category_code.as_deref().unwrap_or_default(),
                transaction.kind.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }
}

/// Write a statement as CSV: one row per transaction, each carrying the
/// day key and the running balance at the end of its day.
pub fn statement_csv<W: Write>(report: &StatementReport, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "day",
        "code",
        "account_code",
        "description",
        "category_code",
        "type",
        "value",
        "daily_balance",
    ])?;

    let mut count = 0;
    for group in &report.ledger.groups {
        for transaction in &group.transactions {
            csv_writer.write_record([
                group.day_key.as_str(),
                transaction.code.as_str(),
                transaction.account_code.as_str(),
                transaction.description.as_str(),
                transaction.category_code.as_deref().unwrap_or_default(),
                transaction.kind.as_str(),
                format_cents(transaction.value).as_str(),
                format_cents(group.daily_balance).as_str(),
            ])?;
            count += 1;
        }
    }

    csv_writer.flush()?;
    Ok(count)
}

/// Write spending per root category as CSV, amounts as plain decimals.
pub fn spending_csv<W: Write>(report: &SpendingReport, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["category", "total", "count", "percentage"])?;

    for share in &report.categories {
        csv_writer.write_record([
            share.category.as_str(),
            format_cents(share.total).as_str(),
            share.count.to_string().as_str(),
            format!("{:.2}", share.percentage).as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(report.categories.len())
}

/// Write a statement as pretty-printed JSON.
pub fn statement_json<W: Write>(report: &StatementReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
