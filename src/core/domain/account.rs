//! Account identity and account information replica types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity of one trading account as seen by the synchronization core.
///
/// The id is an opaque server-side identifier; the application tag routes
/// requests on the server and selects the default application pattern for
/// server-side synchronization waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    id: String,
    application: String,
}

impl AccountHandle {
    /// Create a new account handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the application tag contains anything
    /// outside `[a-zA-Z0-9_]`.
    pub fn new(id: impl Into<String>, application: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let application = application.into();
        if application.is_empty()
            || !application
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Validation(format!(
                "application must match [a-zA-Z0-9_]+, got '{application}'"
            )));
        }
        Ok(Self { id, application })
    }

    /// Get the account id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the application tag.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }
}

/// Account information reported by the terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInformation {
    /// Trading platform identifier, e.g. `mt4` or `mt5`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub broker: String,
    pub currency: String,
    pub server: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin: Decimal,
    pub free_margin: Decimal,
    pub leverage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_level: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_handle_accepts_alphanumeric_tags() {
        let handle = AccountHandle::new("account-1", "MetaApi").unwrap();
        assert_eq!(handle.id(), "account-1");
        assert_eq!(handle.application(), "MetaApi");

        assert!(AccountHandle::new("account-1", "CopyFactory").is_ok());
        assert!(AccountHandle::new("account-1", "app_2").is_ok());
    }

    #[test]
    fn account_handle_rejects_malformed_tags() {
        for tag in ["", "my app", "app-2", "app!", "läpp"] {
            let err = AccountHandle::new("account-1", tag).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "tag '{tag}' passed");
        }
    }
}
