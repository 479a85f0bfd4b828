// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use moneymine::application::LedgerService;
use moneymine::domain::{Account, Category, Cents, RawTransaction, Transaction};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Build a raw transaction for the given account (code or name)
pub fn raw(account: &str, date: &str, value: Cents, description: &str) -> RawTransaction {
    RawTransaction {
        account_code: account.to_string(),
        category_code: None,
        description: description.to_string(),
        kind: None,
        date: date.to_string(),
        value,
    }
}

/// Record a transaction and return it
pub async fn record(
    service: &LedgerService,
    account: &str,
    date: &str,
    value: Cents,
    description: &str,
) -> Result<Transaction> {
    Ok(service
        .record_transaction(raw(account, date, value, description))
        .await?)
}

/// Test fixture: Checking and Savings accounts
pub struct StandardAccounts {
    pub checking: Account,
    pub savings: Account,
}

impl StandardAccounts {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let checking = service
            .create_account("Checking".into(), Some("Main account".into()))
            .await?;
        let savings = service.create_account("Savings".into(), None).await?;
        Ok(Self { checking, savings })
    }
}

/// Test fixture: two root categories, one with subcategories
///
/// Food
///   Groceries
///   Restaurants
/// Home
pub struct StandardCategories {
    pub food: Category,
    pub groceries: Category,
    pub restaurants: Category,
    pub home: Category,
}

impl StandardCategories {
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let food = service.create_category("Food".into(), None).await?;
        let groceries = service
            .create_category("Groceries".into(), Some(food.code.clone()))
            .await?;
        let restaurants = service
            .create_category("Restaurants".into(), Some(food.code.clone()))
            .await?;
        let home = service.create_category("Home".into(), None).await?;
        Ok(Self {
            food,
            groceries,
            restaurants,
            home,
        })
    }
}
