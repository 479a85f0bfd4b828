use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_iso_date, Cents, DateError};

pub type TransactionCode = String;

/// Length of generated entity codes.
pub const CODE_LENGTH: usize = 10;

/// Generate a short opaque code for a new account, category or transaction.
pub fn generate_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(CODE_LENGTH);
    code
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            "TRANSFER" => Some(TransactionType::Transfer),
            _ => None,
        }
    }

    /// Default label for a value whose kind was not given explicitly.
    pub fn for_value(value: Cents) -> Self {
        if value < 0 {
            TransactionType::Withdrawal
        } else {
            TransactionType::Deposit
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dated, signed movement on one account.
/// The sign of `value` is the direction: positive is an inflow, negative an outflow.
/// `kind` is a label only and never changes how the value is counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub code: TransactionCode,
    pub account_code: String,
    pub category_code: Option<String>,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub date: NaiveDate,
    pub value: Cents,
}

impl Transaction {
    pub fn new(account_code: impl Into<String>, date: NaiveDate, value: Cents) -> Self {
        Self {
            code: generate_code(),
            account_code: account_code.into(),
            category_code: None,
            description: String::new(),
            kind: TransactionType::for_value(value),
            date,
            value,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category_code: impl Into<String>) -> Self {
        self.category_code = Some(category_code.into());
        self
    }

    pub fn is_income(&self) -> bool {
        self.value > 0
    }

    pub fn is_expense(&self) -> bool {
        self.value < 0
    }
}

/// A transaction as received from outside (import files, command line),
/// before its date has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub account_code: String,
    #[serde(default)]
    pub category_code: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionType>,
    pub date: String,
    pub value: Cents,
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = DateError;

    fn try_from(raw: RawTransaction) -> Result<Self, Self::Error> {
        let date = parse_iso_date(raw.date.trim())?;
        Ok(Transaction {
            code: generate_code(),
            account_code: raw.account_code,
            category_code: raw.category_code.filter(|c| !c.is_empty()),
            description: raw.description,
            kind: raw
                .kind
                .unwrap_or_else(|| TransactionType::for_value(raw.value)),
            date,
            value: raw.value,
        })
    }
}

/// Partial update of a stored transaction. `None` keeps the current value.
/// The owning account cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub description: Option<String>,
    pub category_code: Option<Option<String>>,
    pub kind: Option<TransactionType>,
    pub date: Option<NaiveDate>,
    pub value: Option<Cents>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category_code.is_none()
            && self.kind.is_none()
            && self.date.is_none()
            && self.value.is_none()
    }

    pub fn apply(self, mut transaction: Transaction) -> Transaction {
        if let Some(description) = self.description {
            transaction.description = description;
        }
        if let Some(category_code) = self.category_code {
            transaction.category_code = category_code;
        }
        if let Some(kind) = self.kind {
            transaction.kind = kind;
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(value) = self.value {
            transaction.value = value;
        }
        transaction
    }
}
