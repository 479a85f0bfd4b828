use serde::Serialize;

use crate::domain::{AggregationResult, CategorySpending, Cents, DayOrder, YearMonth};

/// A month of transactions grouped by day, with carry-over and closing balances.
#[derive(Debug, Clone, Serialize)]
pub struct StatementReport {
    pub period: YearMonth,
    pub accounts: Vec<String>,
    pub categories: Vec<String>,
    pub day_order: DayOrder,
    #[serde(flatten)]
    pub ledger: AggregationResult,
    pub closing_balance: Cents,
}

impl StatementReport {
    pub fn new(
        period: YearMonth,
        accounts: Vec<String>,
        categories: Vec<String>,
        day_order: DayOrder,
        ledger: AggregationResult,
    ) -> Self {
        let closing_balance = ledger.closing_balance();
        Self {
            period,
            accounts,
            categories,
            day_order,
            ledger,
            closing_balance,
        }
    }

    pub fn net(&self) -> Cents {
        self.ledger
            .total_income
            .saturating_sub(self.ledger.total_expenses)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpendingReport {
    pub period: YearMonth,
    pub accounts: Vec<String>,
    pub total: Cents,
    pub categories: Vec<CategoryShare>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: Cents,
    pub count: usize,
    pub percentage: f64,
}

impl SpendingReport {
    pub fn new(period: YearMonth, accounts: Vec<String>, spending: Vec<CategorySpending>) -> Self {
        let total: Cents = spending.iter().map(|s| s.total).sum();
        let categories = spending
            .into_iter()
            .map(|s| CategoryShare {
                percentage: if total > 0 {
                    (s.total as f64 / total as f64) * 100.0
                } else {
                    0.0
                },
                category: s.category,
                total: s.total,
                count: s.count,
            })
            .collect();

        Self {
            period,
            accounts,
            total,
            categories,
        }
    }
}
