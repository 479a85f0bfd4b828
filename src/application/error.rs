use thiserror::Error;

use crate::domain::{DateError, ParseCentsError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account '{name}' still has {count} transaction(s)")]
    AccountInUse { name: String, count: i64 },

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category '{name}' still has {count} subcategory(ies)")]
    CategoryHasChildren { name: String, count: i64 },

    #[error("Category '{name}' is used by {count} transaction(s)")]
    CategoryInUse { name: String, count: i64 },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(#[from] DateError),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] ParseCentsError),

    #[error("Operation not permitted: {0}")]
    OperationNotPermitted(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
