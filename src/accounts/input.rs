//! Add-account input validation

use serde::Deserialize;

/// Raw add-account input as submitted by a form or JSON body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub account_number: String,
}

/// Trimmed, non-empty add-account input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAccountInput {
    pub name: String,
    pub account_number: String,
}

impl AccountInput {
    pub fn new(name: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_number: account_number.into(),
        }
    }

    /// Trim both fields and reject empties
    ///
    /// Returns the message of the first failing field.
    pub fn validate(&self) -> Result<ValidAccountInput, String> {
        let name = self.name.trim();
        let account_number = self.account_number.trim();

        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        if account_number.is_empty() {
            return Err("Account number is required".to_string());
        }

        Ok(ValidAccountInput {
            name: name.to_string(),
            account_number: account_number.to_string(),
        })
    }
}
