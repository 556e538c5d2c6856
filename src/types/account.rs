use std::fmt;

use serde_json::Value;

use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountType {
    Margin,
    Cash,
    Other(String),
}

impl AccountType {
    pub fn from_wire(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "MARGIN" => Self::Margin,
            "CASH" => Self::Cash,
            _ => Self::Other(value.to_string()),
        }
    }

    /// Balance field inside `currentBalances` that holds the spendable amount.
    pub fn funds_field(&self) -> Option<&'static str> {
        match self {
            Self::Margin => Some("availableFunds"),
            Self::Cash => Some("cashAvailableForTrading"),
            Self::Other(_) => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Margin => write!(f, "MARGIN"),
            Self::Cash => write!(f, "CASH"),
            Self::Other(other) => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub account_id: String,
    pub account_type: AccountType,

    /// `None` when the balance field for this account type is missing from the payload.
    pub available_funds: Option<f64>,

    /// The raw `securitiesAccount` object.
    pub raw: Value,
}

impl AccountSnapshot {
    pub fn from_payload(account_id: &str, payload: &Value) -> Result<Self, ProviderError> {
        let account = payload
            .get("securitiesAccount")
            .filter(|account| account.is_object())
            .ok_or_else(|| {
                ProviderError::Malformed(format!(
                    "account {account_id} payload has no securitiesAccount object"
                ))
            })?;

        let account_type = account
            .get("type")
            .and_then(Value::as_str)
            .map(AccountType::from_wire)
            .ok_or_else(|| {
                ProviderError::Malformed(format!("account {account_id} payload has no type"))
            })?;

        let available_funds = match account_type.funds_field() {
            Some(field) => account
                .get("currentBalances")
                .and_then(|balances| balances.get(field))
                .and_then(Value::as_f64),
            /* NOTE: accounts that are neither MARGIN nor CASH report zero */
            None => Some(0.0),
        };

        let account_id = account
            .get("accountId")
            .and_then(Value::as_str)
            .unwrap_or(account_id)
            .to_string();

        Ok(Self {
            account_id,
            account_type,
            available_funds,
            raw: account.clone(),
        })
    }
}
