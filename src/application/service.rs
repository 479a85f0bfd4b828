use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::domain::{
    build_category_tree, creates_cycle, spending_by_root_category, Account, Category,
    CategoryNode, Cents, DayOrder, RawTransaction, Transaction, TransactionUpdate, YearMonth,
};
use crate::storage::{AccountConsolidation, Repository, TransactionQuery};

use super::{build_statement, AppError, SpendingReport, StatementReport};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, importers, tests).
pub struct LedgerService {
    repo: Repository,
}

/// Balance entry for an account
pub struct AccountBalance {
    pub account: Account,
    pub balance: Cents,
    pub transaction_count: i64,
}

/// Filter for querying transactions. Accounts may be given by code or name.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub accounts: Vec<String>,
    pub categories: Vec<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!(database = database_path, "initialized database");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    pub async fn create_account(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Account, AppError> {
        if self.repo.get_account_by_name(&name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(name));
        }

        let mut account = Account::new(name);
        if let Some(desc) = description {
            account = account.with_description(desc);
        }

        self.repo.save_account(&account).await?;
        info!(code = %account.code, name = %account.name, "created account");
        Ok(account)
    }

    /// Get an account by code, falling back to its name.
    pub async fn get_account(&self, code_or_name: &str) -> Result<Account, AppError> {
        if let Some(account) = self.repo.get_account(code_or_name).await? {
            return Ok(account);
        }
        self.repo
            .get_account_by_name(code_or_name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(code_or_name.to_string()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Current balance of an account: the net of all its transactions.
    pub async fn account_balance(&self, code_or_name: &str) -> Result<AccountBalance, AppError> {
        let account = self.get_account(code_or_name).await?;
        let balance = self.repo.compute_balance(&account.code).await?;
        let transaction_count = self
            .repo
            .count_transactions_for_account(&account.code)
            .await?;
        Ok(AccountBalance {
            account,
            balance,
            transaction_count,
        })
    }

    /// Rename an account or change its description. `Some(None)` clears the
    /// description. Names stay unique.
    pub async fn update_account(
        &self,
        code_or_name: &str,
        name: Option<String>,
        description: Option<Option<String>>,
    ) -> Result<Account, AppError> {
        let mut account = self.get_account(code_or_name).await?;

        if let Some(name) = name.filter(|n| *n != account.name) {
            if let Some(other) = self.repo.get_account_by_name(&name).await? {
                if other.code != account.code {
                    return Err(AppError::AccountAlreadyExists(name));
                }
            }
            account.name = name;
        }
        if let Some(description) = description {
            account.description = description.filter(|d| !d.is_empty());
        }

        self.repo.update_account(&account).await?;
        info!(code = %account.code, name = %account.name, "updated account");
        Ok(account)
    }

    /// Delete an account. Refused while it still has transactions.
    pub async fn delete_account(&self, code_or_name: &str) -> Result<Account, AppError> {
        let account = self.get_account(code_or_name).await?;
        let count = self
            .repo
            .count_transactions_for_account(&account.code)
            .await?;
        if count > 0 {
            return Err(AppError::AccountInUse {
                name: account.name,
                count,
            });
        }

        self.repo.delete_account(&account.code).await?;
        info!(code = %account.code, "deleted account");
        Ok(account)
    }

    async fn resolve_account_codes(
        &self,
        accounts: &[String],
    ) -> Result<BTreeSet<String>, AppError> {
        let mut codes = BTreeSet::new();
        for account in accounts {
            codes.insert(self.get_account(account).await?.code);
        }
        Ok(codes)
    }

    // ========================
    // Category operations
    // ========================

    /// Create a category, optionally below an existing parent.
    pub async fn create_category(
        &self,
        name: String,
        parent_code: Option<String>,
    ) -> Result<Category, AppError> {
        let mut category = Category::new(name);
        if let Some(parent) = parent_code.filter(|p| !p.is_empty()) {
            let parent = self.get_category(&parent).await?;
            category = category.with_parent(parent.code);
        }

        self.repo.save_category(&category).await?;
        info!(code = %category.code, name = %category.name, "created category");
        Ok(category)
    }

    pub async fn get_category(&self, code: &str) -> Result<Category, AppError> {
        self.repo
            .get_category(code)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(code.to_string()))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.repo.list_categories().await?)
    }

    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>, AppError> {
        let categories = self.repo.list_categories().await?;
        Ok(build_category_tree(&categories))
    }

    /// Rename a category or move it. `Some(None)` turns it into a root category.
    /// Moving a category below itself or one of its descendants is refused.
    pub async fn update_category(
        &self,
        code: &str,
        name: Option<String>,
        parent_code: Option<Option<String>>,
    ) -> Result<Category, AppError> {
        let mut category = self.get_category(code).await?;

        if let Some(name) = name {
            category.name = name;
        }
        if let Some(parent_code) = parent_code {
            category.parent_category_code = match parent_code.filter(|p| !p.is_empty()) {
                None => None,
                Some(parent) => {
                    let parent = self.get_category(&parent).await?;
                    let categories = self.repo.list_categories().await?;
                    if creates_cycle(&category.code, &parent.code, &categories) {
                        return Err(AppError::OperationNotPermitted(format!(
                            "cannot move '{}' below its own subcategory '{}'",
                            category.name, parent.name
                        )));
                    }
                    Some(parent.code)
                }
            };
        }

        self.repo.update_category(&category).await?;
        info!(code = %category.code, name = %category.name, "updated category");
        Ok(category)
    }

    /// Delete a category. Refused while it has subcategories or transactions.
    pub async fn delete_category(&self, code: &str) -> Result<Category, AppError> {
        let category = self.get_category(code).await?;

        let children = self.repo.count_child_categories(&category.code).await?;
        if children > 0 {
            return Err(AppError::CategoryHasChildren {
                name: category.name,
                count: children,
            });
        }
        let used_by = self
            .repo
            .count_transactions_for_category(&category.code)
            .await?;
        if used_by > 0 {
            return Err(AppError::CategoryInUse {
                name: category.name,
                count: used_by,
            });
        }

        self.repo.delete_category(&category.code).await?;
        info!(code = %category.code, "deleted category");
        Ok(category)
    }

    async fn resolve_category_codes(
        &self,
        categories: &[String],
    ) -> Result<BTreeSet<String>, AppError> {
        let mut codes = BTreeSet::new();
        for code in categories {
            codes.insert(self.get_category(code).await?.code);
        }
        Ok(codes)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Validate and store a transaction received from outside.
    /// `raw.account_code` may hold an account code or name.
    pub async fn record_transaction(&self, raw: RawTransaction) -> Result<Transaction, AppError> {
        let account = self.get_account(&raw.account_code).await?;
        if let Some(category_code) = raw.category_code.as_deref().filter(|c| !c.is_empty()) {
            self.get_category(category_code).await?;
        }

        let mut transaction = Transaction::try_from(raw)?;
        transaction.account_code = account.code;

        self.repo.save_transaction(&transaction).await?;
        info!(
            code = %transaction.code,
            account = %transaction.account_code,
            date = %transaction.date,
            value = transaction.value,
            "recorded transaction"
        );
        Ok(transaction)
    }

    pub async fn get_transaction(&self, code: &str) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(code)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(code.to_string()))
    }

    /// Apply a partial update. The owning account never changes.
    pub async fn update_transaction(
        &self,
        code: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction, AppError> {
        let current = self.get_transaction(code).await?;
        if update.is_empty() {
            debug!(code, "empty transaction update");
            return Ok(current);
        }
        if let Some(Some(category_code)) = &update.category_code {
            self.get_category(category_code).await?;
        }

        let updated = update.apply(current);
        self.repo.update_transaction(&updated).await?;
        info!(code = %updated.code, "updated transaction");
        Ok(updated)
    }

    pub async fn delete_transaction(&self, code: &str) -> Result<Transaction, AppError> {
        let transaction = self.get_transaction(code).await?;
        self.repo.delete_transaction(&transaction.code).await?;
        info!(code = %transaction.code, "deleted transaction");
        Ok(transaction)
    }

    /// List transactions in insertion order.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let query = TransactionQuery {
            account_codes: self
                .resolve_account_codes(&filter.accounts)
                .await?
                .into_iter()
                .collect(),
            category_codes: self
                .resolve_category_codes(&filter.categories)
                .await?
                .into_iter()
                .collect(),
            from_date: filter.from_date,
            to_date: filter.to_date,
            limit: filter.limit,
        };
        Ok(self.repo.list_transactions(&query).await?)
    }

    // ========================
    // Statements and reports
    // ========================

    /// Transactions of `period` grouped by day, with running balances starting
    /// from the carry-over balance of the selected accounts.
    pub async fn monthly_statement(
        &self,
        period: YearMonth,
        accounts: &[String],
        categories: &[String],
        order: DayOrder,
    ) -> Result<StatementReport, AppError> {
        let account_codes = self.resolve_account_codes(accounts).await?;
        let category_codes = self.resolve_category_codes(categories).await?;

        let report = build_statement(
            &self.repo,
            &self.repo,
            period,
            &account_codes,
            &category_codes,
            order,
        )
        .await?;

        debug!(
            %period,
            days = report.ledger.groups.len(),
            closing_balance = report.closing_balance,
            "built statement"
        );
        Ok(report)
    }

    /// Outflows of `period` summed per root category.
    pub async fn spending_by_category(
        &self,
        period: YearMonth,
        accounts: &[String],
    ) -> Result<SpendingReport, AppError> {
        let account_codes = self.resolve_account_codes(accounts).await?;
        let query = TransactionQuery::for_month(
            period,
            account_codes.iter().cloned().collect(),
            Vec::new(),
        );
        let transactions = self.repo.list_transactions(&query).await?;
        let categories = self.repo.list_categories().await?;

        let spending = spending_by_root_category(&transactions, &categories);
        Ok(SpendingReport::new(
            period,
            account_codes.into_iter().collect(),
            spending,
        ))
    }

    // ========================
    // Consolidations
    // ========================

    /// Recompute and store the net movement of an account for one month.
    pub async fn refresh_consolidation(
        &self,
        account: &str,
        month: YearMonth,
    ) -> Result<AccountConsolidation, AppError> {
        let account = self.get_account(account).await?;
        let balance = self
            .repo
            .sum_between(&account.code, month.first_day(), month.last_day())
            .await?;

        let consolidation = AccountConsolidation {
            account_code: account.code,
            month,
            balance,
            updated_at: Utc::now(),
        };
        self.repo.upsert_consolidation(&consolidation).await?;
        info!(
            account = %consolidation.account_code,
            %month,
            balance,
            "refreshed consolidation"
        );
        Ok(consolidation)
    }

    pub async fn list_consolidations(
        &self,
        account: &str,
        from: Option<YearMonth>,
        to: Option<YearMonth>,
    ) -> Result<Vec<AccountConsolidation>, AppError> {
        let account = self.get_account(account).await?;
        Ok(self
            .repo
            .list_consolidations(&account.code, from, to)
            .await?)
    }
}
