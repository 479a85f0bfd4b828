use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_code;

pub type AccountCode = String;

/// A place money lives in: a bank account, a wallet, a credit card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub code: AccountCode,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            code: generate_code(),
            name: name.into(),
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
