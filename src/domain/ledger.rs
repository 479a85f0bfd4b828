use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::category::root_in;
use super::{day_key, Category, Cents, Transaction};

/// Label used for spending with no (known) category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Order in which day groups are reported and balances accumulated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayOrder {
    /// Days appear in the order their first transaction appears in the input.
    #[default]
    FirstSeen,
    /// Days sorted by calendar date, ascending.
    Chronological,
}

impl DayOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayOrder::FirstSeen => "first-seen",
            DayOrder::Chronological => "chronological",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "first-seen" | "first_seen" => Some(DayOrder::FirstSeen),
            "chronological" => Some(DayOrder::Chronological),
            _ => None,
        }
    }
}

/// Transactions of one calendar day with the running balance after that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyGroup {
    pub date: NaiveDate,
    pub day_key: String,
    /// In input order, never re-sorted
    pub transactions: Vec<Transaction>,
    pub daily_total: Cents,
    /// Opening balance plus every day up to and including this one
    pub daily_balance: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub groups: Vec<DailyGroup>,
    pub total_income: Cents,
    pub total_expenses: Cents,
    pub opening_balance: Cents,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AggregationResult {
    /// Look up a day group by its `DD/MM/YYYY` key.
    pub fn group(&self, day_key: &str) -> Option<&DailyGroup> {
        self.index.get(day_key).map(|&i| &self.groups[i])
    }

    pub fn day_keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.day_key.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn transaction_count(&self) -> usize {
        self.groups.iter().map(|g| g.transactions.len()).sum()
    }

    /// Opening balance plus the period's net movement.
    pub fn closing_balance(&self) -> Cents {
        self.opening_balance
            .saturating_add(self.total_income)
            .saturating_sub(self.total_expenses)
    }
}

/// Group transactions by day and compute running balances from `opening_balance`.
/// Days are reported in first-seen order. Sums saturate at the `Cents` bounds.
pub fn aggregate(transactions: &[Transaction], opening_balance: Cents) -> AggregationResult {
    aggregate_with(transactions, opening_balance, DayOrder::FirstSeen)
}

/// Like [`aggregate`], with an explicit day order for grouping and accumulation.
pub fn aggregate_with(
    transactions: &[Transaction],
    opening_balance: Cents,
    order: DayOrder,
) -> AggregationResult {
    let mut groups: Vec<DailyGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut total_income: Cents = 0;
    let mut total_expenses: Cents = 0;

    for transaction in transactions {
        let key = day_key(transaction.date);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(DailyGroup {
                date: transaction.date,
                day_key: key,
                transactions: Vec::new(),
                daily_total: 0,
                daily_balance: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.transactions.push(transaction.clone());
        group.daily_total = group.daily_total.saturating_add(transaction.value);

        if transaction.is_income() {
            total_income = total_income.saturating_add(transaction.value);
        } else if transaction.is_expense() {
            total_expenses = total_expenses.saturating_add(transaction.value.saturating_abs());
        }
    }

    if order == DayOrder::Chronological {
        groups.sort_by_key(|g| g.date);
        for (i, group) in groups.iter().enumerate() {
            index.insert(group.day_key.clone(), i);
        }
    }

    let mut cumulative = opening_balance;
    for group in &mut groups {
        cumulative = cumulative.saturating_add(group.daily_total);
        group.daily_balance = cumulative;
    }

    AggregationResult {
        groups,
        total_income,
        total_expenses,
        opening_balance,
        index,
    }
}

/// Spending of one root category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    /// Absolute amount spent, always >= 0
    pub total: Cents,
    pub count: usize,
}

/// Sum outflows per root category, in order of first appearance.
/// Inflows and zero-valued transactions are ignored.
pub fn spending_by_root_category(
    transactions: &[Transaction],
    categories: &[Category],
) -> Vec<CategorySpending> {
    let by_code: HashMap<&str, &Category> =
        categories.iter().map(|c| (c.code.as_str(), c)).collect();

    let mut spending: Vec<CategorySpending> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.is_expense()) {
        let label = transaction
            .category_code
            .as_deref()
            .and_then(|code| root_in(code, &by_code))
            .map(|root| root.name.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string());

        let slot = *position.entry(label.clone()).or_insert_with(|| {
            spending.push(CategorySpending {
                category: label,
                total: 0,
                count: 0,
            });
            spending.len() - 1
        });
        let entry = &mut spending[slot];
        entry.total = entry.total.saturating_add(transaction.value.saturating_abs());
        entry.count += 1;
    }

    spending
}
