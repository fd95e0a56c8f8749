use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Represents a ledger participant.
///
/// An account is an opaque string identifier; there is no registration step
/// and no key material, so any string names a valid account. Equality is
/// exact string match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account(String);

impl Account {
    /// Creates a new account identifier from any string
    pub fn new<S: Into<String>>(name: S) -> Self {
        Account(name.into())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Account {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Account(s.to_string()))
    }
}

impl From<&str> for Account {
    fn from(s: &str) -> Self {
        Account(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_equality() {
        let a = Account::new("alice");
        let b = Account::from("alice");

        assert_eq!(a, b);
        assert_ne!(a, Account::new("Alice"));
    }

    #[test]
    fn test_account_serializes_as_bare_string() {
        let account = Account::new("guilospanck");

        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, "\"guilospanck\"");

        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
