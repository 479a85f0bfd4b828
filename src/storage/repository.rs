use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::{
    parse_iso_date, Account, Category, Cents, Transaction, TransactionType, YearMonth,
};

use super::MIGRATION_001_INITIAL;

const TRANSACTION_COLUMNS: &str =
    "code, account_code, category_code, description, type, date, value_cents";

/// Filters for listing transactions. Empty code lists mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub account_codes: Vec<String>,
    pub category_codes: Vec<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl TransactionQuery {
    /// All transactions of `month` for the given accounts and categories.
    pub fn for_month(
        month: YearMonth,
        account_codes: Vec<String>,
        category_codes: Vec<String>,
    ) -> Self {
        Self {
            account_codes,
            category_codes,
            from_date: Some(month.first_day()),
            to_date: Some(month.last_day()),
            limit: None,
        }
    }
}

/// Stored net movement of an account over one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountConsolidation {
    pub account_code: String,
    pub month: YearMonth,
    pub balance: Cents,
    pub updated_at: DateTime<Utc>,
}

/// Repository for persisting and querying accounts, categories and transactions.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        debug!(database_url, "connected to database");
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (code, name, description, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&account.code)
        .bind(&account.name)
        .bind(&account.description)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    pub async fn get_account(&self, code: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT code, name, description, created_at FROM accounts WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT code, name, description, created_at FROM accounts WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by name")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT code, name, description, created_at FROM accounts ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn update_account(&self, account: &Account) -> Result<()> {
        sqlx::query("UPDATE accounts SET name = ?, description = ? WHERE code = ?")
            .bind(&account.name)
            .bind(&account.description)
            .bind(&account.code)
            .execute(&self.pool)
            .await
            .context("Failed to update account")?;
        Ok(())
    }

    /// Delete an account together with its consolidations.
    /// Callers must make sure no transactions reference it.
    pub async fn delete_account(&self, code: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM account_consolidations WHERE account_code = ?")
            .bind(code)
            .execute(&mut *tx)
            .await
            .context("Failed to delete account consolidations")?;
        sqlx::query("DELETE FROM accounts WHERE code = ?")
            .bind(code)
            .execute(&mut *tx)
            .await
            .context("Failed to delete account")?;

        tx.commit().await.context("Failed to commit account deletion")?;
        Ok(())
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let created_at_str: String = row.get("created_at");
        Ok(Account {
            code: row.get("code"),
            name: row.get("name"),
            description: row.get("description"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Category operations
    // ========================

    pub async fn save_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (code, name, parent_category_code, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&category.code)
        .bind(&category.name)
        .bind(&category.parent_category_code)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save category")?;
        Ok(())
    }

    pub async fn get_category(&self, code: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT code, name, parent_category_code, created_at FROM categories WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    /// List categories in creation order, so trees keep the order siblings were added in.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT code, name, parent_category_code, created_at FROM categories ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter().map(Self::row_to_category).collect()
    }

    pub async fn count_child_categories(&self, code: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM categories WHERE parent_category_code = ?",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count child categories")?;
        Ok(row.get("count"))
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        sqlx::query("UPDATE categories SET name = ?, parent_category_code = ? WHERE code = ?")
            .bind(&category.name)
            .bind(&category.parent_category_code)
            .bind(&category.code)
            .execute(&self.pool)
            .await
            .context("Failed to update category")?;
        Ok(())
    }

    pub async fn delete_category(&self, code: &str) -> Result<()> {
        sqlx::query("DELETE FROM categories WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;
        Ok(())
    }

    fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
        let created_at_str: String = row.get("created_at");
        Ok(Category {
            code: row.get("code"),
            name: row.get("name"),
            parent_category_code: row.get("parent_category_code"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Transaction operations
    // ========================

    pub async fn save_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (code, account_code, category_code, description, type, date, value_cents)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.code)
        .bind(&transaction.account_code)
        .bind(&transaction.category_code)
        .bind(&transaction.description)
        .bind(transaction.kind.as_str())
        .bind(transaction.date.to_string())
        .bind(transaction.value)
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    pub async fn get_transaction(&self, code: &str) -> Result<Option<Transaction>> {
        let query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE code = ?");
        let row = sqlx::query(&query)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    /// Overwrite every mutable column of a stored transaction.
    /// The account code is never touched.
    pub async fn update_transaction(&self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET category_code = ?, description = ?, type = ?, date = ?, value_cents = ?
            WHERE code = ?
            "#,
        )
        .bind(&transaction.category_code)
        .bind(&transaction.description)
        .bind(transaction.kind.as_str())
        .bind(transaction.date.to_string())
        .bind(transaction.value)
        .bind(&transaction.code)
        .execute(&self.pool)
        .await
        .context("Failed to update transaction")?;
        Ok(())
    }

    pub async fn delete_transaction(&self, code: &str) -> Result<()> {
        sqlx::query("DELETE FROM transactions WHERE code = ?")
            .bind(code)
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;
        Ok(())
    }

    /// List transactions matching the query, in insertion order.
    pub async fn list_transactions(&self, filter: &TransactionQuery) -> Result<Vec<Transaction>> {
        let mut query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE 1=1");

        let from_date_str = filter.from_date.map(|d| d.to_string());
        let to_date_str = filter.to_date.map(|d| d.to_string());

        if !filter.account_codes.is_empty() {
            query.push_str(&format!(
                " AND account_code IN ({})",
                placeholders(filter.account_codes.len())
            ));
        }
        if !filter.category_codes.is_empty() {
            query.push_str(&format!(
                " AND category_code IN ({})",
                placeholders(filter.category_codes.len())
            ));
        }
        if from_date_str.is_some() {
            query.push_str(" AND date >= ?");
        }
        if to_date_str.is_some() {
            query.push_str(" AND date <= ?");
        }

        query.push_str(" ORDER BY id");

        if let Some(lim) = filter.limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let mut sql_query = sqlx::query(&query);
        for code in &filter.account_codes {
            sql_query = sql_query.bind(code);
        }
        for code in &filter.category_codes {
            sql_query = sql_query.bind(code);
        }
        if let Some(ref from) = from_date_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = to_date_str {
            sql_query = sql_query.bind(to);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        debug!(count = rows.len(), "listed transactions");
        rows.iter().map(Self::row_to_transaction).collect()
    }

    pub async fn count_transactions_for_account(&self, account_code: &str) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE account_code = ?")
            .bind(account_code)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?;
        Ok(row.get("count"))
    }

    pub async fn count_transactions_for_category(&self, category_code: &str) -> Result<i64> {
        let row =
            sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE category_code = ?")
                .bind(category_code)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count transactions")?;
        Ok(row.get("count"))
    }

    /// Net of every transaction of an account.
    pub async fn compute_balance(&self, account_code: &str) -> Result<Cents> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(value_cents), 0) as balance \
             FROM transactions WHERE account_code = ?",
        )
        .bind(account_code)
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute balance")?;
        Ok(row.get("balance"))
    }

    /// Net of all transactions of the given accounts dated strictly before `date`.
    /// An empty account list sums nothing.
    pub async fn sum_before(&self, account_codes: &[String], date: NaiveDate) -> Result<Cents> {
        if account_codes.is_empty() {
            return Ok(0);
        }

        let query = format!(
            "SELECT COALESCE(SUM(value_cents), 0) as total \
             FROM transactions WHERE date < ? AND account_code IN ({})",
            placeholders(account_codes.len())
        );
        let mut sql_query = sqlx::query(&query).bind(date.to_string());
        for code in account_codes {
            sql_query = sql_query.bind(code);
        }

        let row = sql_query
            .fetch_one(&self.pool)
            .await
            .context("Failed to sum balance")?;
        Ok(row.get("total"))
    }

    /// Net of one account's transactions between two dates, both inclusive.
    pub async fn sum_between(
        &self,
        account_code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(value_cents), 0) as total
            FROM transactions
            WHERE account_code = ? AND date >= ? AND date <= ?
            "#,
        )
        .bind(account_code)
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum transactions")?;
        Ok(row.get("total"))
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let kind_str: String = row.get("type");
        let date_str: String = row.get("date");

        Ok(Transaction {
            code: row.get("code"),
            account_code: row.get("account_code"),
            category_code: row.get("category_code"),
            description: row.get("description"),
            kind: TransactionType::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", kind_str))?,
            date: parse_iso_date(&date_str).context("Invalid stored transaction date")?,
            value: row.get("value_cents"),
        })
    }

    // ========================
    // Consolidation operations
    // ========================

    /// Insert or replace the consolidated balance of an account for a month.
    pub async fn upsert_consolidation(&self, consolidation: &AccountConsolidation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO account_consolidations (account_code, month, balance_cents, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (account_code, month)
            DO UPDATE SET balance_cents = excluded.balance_cents, updated_at = excluded.updated_at
            "#,
        )
        .bind(&consolidation.account_code)
        .bind(consolidation.month.to_string())
        .bind(consolidation.balance)
        .bind(consolidation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save consolidation")?;
        Ok(())
    }

    /// List consolidations of an account, oldest month first, optionally bounded (inclusive).
    pub async fn list_consolidations(
        &self,
        account_code: &str,
        from: Option<YearMonth>,
        to: Option<YearMonth>,
    ) -> Result<Vec<AccountConsolidation>> {
        let mut query = String::from(
            "SELECT account_code, month, balance_cents, updated_at \
             FROM account_consolidations WHERE account_code = ?",
        );
        let from_str = from.map(|m| m.to_string());
        let to_str = to.map(|m| m.to_string());
        if from_str.is_some() {
            query.push_str(" AND month >= ?");
        }
        if to_str.is_some() {
            query.push_str(" AND month <= ?");
        }
        query.push_str(" ORDER BY month");

        let mut sql_query = sqlx::query(&query).bind(account_code);
        if let Some(ref from) = from_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = to_str {
            sql_query = sql_query.bind(to);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list consolidations")?;

        rows.iter().map(Self::row_to_consolidation).collect()
    }

    fn row_to_consolidation(row: &sqlx::sqlite::SqliteRow) -> Result<AccountConsolidation> {
        let month_str: String = row.get("month");
        let updated_at_str: String = row.get("updated_at");
        Ok(AccountConsolidation {
            account_code: row.get("account_code"),
            month: YearMonth::parse(&month_str).context("Invalid stored month")?,
            balance: row.get("balance_cents"),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
