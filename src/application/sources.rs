use std::collections::BTreeSet;

use anyhow::Result;
use tracing::debug;

use crate::domain::{aggregate_with, Cents, DayOrder, Transaction, YearMonth};
use crate::storage::{Repository, TransactionQuery};

use super::StatementReport;

/// Supplies the transactions of a month, filtered by account and category.
///
/// Only transactions dated inside `period` are returned. An empty account set
/// means every account, an empty category set means every category. The order
/// of the returned list is not guaranteed to be chronological.
#[allow(async_fn_in_trait)]
pub trait TransactionSource {
    async fn fetch_transactions(
        &self,
        period: YearMonth,
        accounts: &BTreeSet<String>,
        categories: &BTreeSet<String>,
    ) -> Result<Vec<Transaction>>;
}

/// Supplies the carry-over balance a statement starts from.
///
/// The balance is the net of the given accounts as of the end of the month
/// before `as_of`, summed across accounts. No accounts means zero.
#[allow(async_fn_in_trait)]
pub trait BalanceSource {
    async fn fetch_opening_balance(
        &self,
        accounts: &BTreeSet<String>,
        as_of: YearMonth,
    ) -> Result<Cents>;
}

impl TransactionSource for Repository {
    async fn fetch_transactions(
        &self,
        period: YearMonth,
        accounts: &BTreeSet<String>,
        categories: &BTreeSet<String>,
    ) -> Result<Vec<Transaction>> {
        let query = TransactionQuery::for_month(
            period,
            accounts.iter().cloned().collect(),
            categories.iter().cloned().collect(),
        );
        self.list_transactions(&query).await
    }
}

impl BalanceSource for Repository {
    async fn fetch_opening_balance(
        &self,
        accounts: &BTreeSet<String>,
        as_of: YearMonth,
    ) -> Result<Cents> {
        let accounts: Vec<String> = accounts.iter().cloned().collect();
        self.sum_before(&accounts, as_of.first_day()).await
    }
}

/// Fetch a month of transactions and its opening balance, then aggregate them.
pub async fn build_statement<T, B>(
    transactions: &T,
    balances: &B,
    period: YearMonth,
    accounts: &BTreeSet<String>,
    categories: &BTreeSet<String>,
    order: DayOrder,
) -> Result<StatementReport>
where
    T: TransactionSource,
    B: BalanceSource,
{
    let fetched = transactions
        .fetch_transactions(period, accounts, categories)
        .await?;
    let opening_balance = balances.fetch_opening_balance(accounts, period).await?;

    debug!(
        %period,
        transactions = fetched.len(),
        opening_balance,
        "building statement"
    );

    let ledger = aggregate_with(&fetched, opening_balance, order);
    Ok(StatementReport::new(
        period,
        accounts.iter().cloned().collect(),
        categories.iter().cloned().collect(),
        order,
        ledger,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    /// In-memory stand-in for the storage layer.
    struct MemorySource {
        transactions: Vec<Transaction>,
    }

    impl TransactionSource for MemorySource {
        async fn fetch_transactions(
            &self,
            period: YearMonth,
            accounts: &BTreeSet<String>,
            categories: &BTreeSet<String>,
        ) -> Result<Vec<Transaction>> {
            Ok(self
                .transactions
                .iter()
                .filter(|t| period.contains(t.date))
                .filter(|t| accounts.is_empty() || accounts.contains(&t.account_code))
                .filter(|t| {
                    categories.is_empty()
                        || t.category_code
                            .as_ref()
                            .is_some_and(|c| categories.contains(c))
                })
                .cloned()
                .collect())
        }
    }

    impl BalanceSource for MemorySource {
        async fn fetch_opening_balance(
            &self,
            accounts: &BTreeSet<String>,
            as_of: YearMonth,
        ) -> Result<Cents> {
            Ok(self
                .transactions
                .iter()
                .filter(|t| accounts.contains(&t.account_code) && t.date < as_of.first_day())
                .map(|t| t.value)
                .sum())
        }
    }

    fn tx(account: &str, date: &str, value: Cents) -> Transaction {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Transaction::new(account, date, value)
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_build_statement_uses_carry_over() {
        let source = MemorySource {
            transactions: vec![
                tx("checking", "2024-02-10", 20000),
                tx("savings", "2024-02-11", 99999),
                tx("checking", "2024-03-01", 10000),
                tx("checking", "2024-03-01", -3000),
                tx("checking", "2024-03-02", 5000),
                tx("checking", "2024-04-01", 70000),
            ],
        };

        let month = YearMonth::parse("2024-03").unwrap();
        let report = build_statement(
            &source,
            &source,
            month,
            &set(&["checking"]),
            &BTreeSet::new(),
            DayOrder::FirstSeen,
        )
        .await
        .unwrap();

        assert_eq!(report.ledger.opening_balance, 20000);
        assert_eq!(report.ledger.group("01/03/2024").unwrap().daily_balance, 27000);
        assert_eq!(report.ledger.group("02/03/2024").unwrap().daily_balance, 32000);
        assert_eq!(report.ledger.total_income, 15000);
        assert_eq!(report.ledger.total_expenses, 3000);
        assert_eq!(report.closing_balance, 32000);
    }

    #[tokio::test]
    async fn test_no_accounts_means_zero_opening_balance() {
        let source = MemorySource {
            transactions: vec![
                tx("checking", "2024-02-10", 20000),
                tx("checking", "2024-03-05", -100),
            ],
        };

        let month = YearMonth::parse("2024-03").unwrap();
        let report = build_statement(
            &source,
            &source,
            month,
            &BTreeSet::new(),
            &BTreeSet::new(),
            DayOrder::FirstSeen,
        )
        .await
        .unwrap();

        assert_eq!(report.ledger.opening_balance, 0);
        assert_eq!(report.ledger.transaction_count(), 1);
        assert_eq!(report.closing_balance, -100);
    }
}
