use std::collections::HashSet;
use std::io::Read;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::application::{LedgerService, TransactionFilter};
use crate::domain::{parse_cents, parse_iso_date, Cents, RawTransaction, TransactionType};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every record without writing anything
    pub dry_run: bool,
    /// Skip records whose date, description and value match an existing
    /// transaction of the same account (re-uploaded bank statements)
    pub skip_duplicates: bool,
}

/// One row of a transactions CSV file.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    #[serde(default)]
    description: String,
    value: String,
    #[serde(default)]
    category_code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// One entry of a bank statement converted to JSON.
#[derive(Debug, Deserialize)]
struct StatementEntry {
    date: String,
    #[serde(default)]
    description: Option<String>,
    value: f64,
}

type DuplicateKey = (NaiveDate, String, Cents);

/// Importer for loading transactions into one account
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import transactions from CSV with a header row:
    /// `date,description,value[,category_code,type]`
    pub async fn import_transactions_csv<R: Read>(
        &self,
        reader: R,
        account: &str,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let account_code = self.service.get_account(account).await?.code;
        let mut seen = self.existing_keys(&account_code, &options).await?;
        let mut result = ImportResult::default();

        let mut csv_reader = csv::Reader::from_reader(reader);
        for (line_num, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let value = match parse_cents(&row.value) {
                Ok(v) => v,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("value".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let kind = match row.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
                None => None,
                Some(k) => match TransactionType::from_str(k) {
                    Some(kind) => Some(kind),
                    None => {
                        result.errors.push(ImportError {
                            line,
                            field: Some("type".to_string()),
                            error: format!("Unknown transaction type: {}", k),
                        });
                        continue;
                    }
                },
            };

            let raw = RawTransaction {
                account_code: account_code.clone(),
                category_code: row.category_code.filter(|c| !c.is_empty()),
                description: row.description,
                kind,
                date: row.date,
                value,
            };
            self.import_one(raw, line, &options, &mut seen, &mut result)
                .await;
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "csv import finished"
        );
        Ok(result)
    }

    /// Import a bank statement exported as a JSON array of
    /// `{ "date": "YYYY-MM-DD", "description": "...", "value": -12.5 }`.
    pub async fn import_statement_json<R: Read>(
        &self,
        reader: R,
        account: &str,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let account_code = self.service.get_account(account).await?.code;
        let entries: Vec<StatementEntry> = serde_json::from_reader(reader)?;
        let mut seen = self.existing_keys(&account_code, &options).await?;
        let mut result = ImportResult::default();

        for (index, entry) in entries.into_iter().enumerate() {
            let line = index + 1;

            let Some(value) = float_to_cents(entry.value) else {
                result.errors.push(ImportError {
                    line,
                    field: Some("value".to_string()),
                    error: format!("Invalid amount: {}", entry.value),
                });
                continue;
            };

            let raw = RawTransaction {
                account_code: account_code.clone(),
                category_code: None,
                description: entry.description.unwrap_or_default(),
                kind: None,
                date: entry.date,
                value,
            };
            self.import_one(raw, line, &options, &mut seen, &mut result)
                .await;
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "statement import finished"
        );
        Ok(result)
    }

    async fn import_one(
        &self,
        raw: RawTransaction,
        line: usize,
        options: &ImportOptions,
        seen: &mut HashSet<DuplicateKey>,
        result: &mut ImportResult,
    ) {
        let date = match parse_iso_date(raw.date.trim()) {
            Ok(date) => date,
            Err(e) => {
                warn!(line, error = %e, "rejected record");
                result.errors.push(ImportError {
                    line,
                    field: Some("date".to_string()),
                    error: e.to_string(),
                });
                return;
            }
        };

        if options.skip_duplicates {
            let key = (date, raw.description.clone(), raw.value);
            if !seen.insert(key) {
                result.skipped += 1;
                return;
            }
        }

        if options.dry_run {
            result.imported += 1;
            return;
        }

        match self.service.record_transaction(raw).await {
            Ok(_) => result.imported += 1,
            Err(e) => result.errors.push(ImportError {
                line,
                field: None,
                error: format!("Transaction creation failed: {}", e),
            }),
        }
    }

    async fn existing_keys(
        &self,
        account_code: &str,
        options: &ImportOptions,
    ) -> Result<HashSet<DuplicateKey>> {
        if !options.skip_duplicates {
            return Ok(HashSet::new());
        }

        let existing = self
            .service
            .list_transactions(TransactionFilter {
                accounts: vec![account_code.to_string()],
                ..Default::default()
            })
            .await?;

        Ok(existing
            .into_iter()
            .map(|t| (t.date, t.description, t.value))
            .collect())
    }
}

/// Convert a float amount to cents, rounding to the nearest cent.
fn float_to_cents(value: f64) -> Option<Cents> {
    let cents = (value * 100.0).round();
    if cents.is_finite() && cents.abs() < i64::MAX as f64 {
        Some(cents as Cents)
    } else {
        None
    }
}
