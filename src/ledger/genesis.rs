use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::account::Account;

/// The balance snapshot written on first run
const DEFAULT_GENESIS_JSON: &str = r#"{
  "genesis_time": "2021-09-09T19:40:22.415Z",
  "chain_id": "the-blockchain-bar-ledger_TBB",
  "balances": {
    "guilospanck": 1000000
  }
}
"#;

/// Errors that can occur while loading a genesis file
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Failed to read genesis file: {0}")]
    Read(#[from] io::Error),

    #[error("Malformed genesis file: {0}")]
    Format(#[from] serde_json::Error),
}

/// The initial balance snapshot a ledger starts from
///
/// Loaded exactly once at bootstrap, before any log replay. Duplicate
/// account keys are not expressible; map semantics de-duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genesis {
    pub genesis_time: DateTime<Utc>,
    pub chain_id: String,
    pub balances: BTreeMap<Account, u64>,
}

/// Loads a genesis file from disk
///
/// Pure read: no side effects beyond the file access. Fails with
/// [`GenesisError::Read`] if the file is missing or unreadable, and with
/// [`GenesisError::Format`] if the content is not a valid balance snapshot.
pub fn load(path: &Path) -> Result<Genesis, GenesisError> {
    let content = fs::read_to_string(path)?;
    let genesis = serde_json::from_str(&content)?;

    Ok(genesis)
}

/// Writes the default genesis document, used when initializing a fresh
/// data directory
pub fn write_default(path: &Path) -> io::Result<()> {
    fs::write(path, DEFAULT_GENESIS_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use tempfile::tempdir;

    #[test]
    fn test_load_default_genesis() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        write_default(&path).unwrap();

        let genesis = load(&path).unwrap();

        assert_eq!(genesis.chain_id, "the-blockchain-bar-ledger_TBB");
        assert_eq!(genesis.genesis_time.year(), 2021);
        assert_eq!(genesis.balances.len(), 1);
        assert_eq!(genesis.balances[&Account::new("guilospanck")], 1_000_000);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempdir().unwrap();

        let err = load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, GenesisError::Read(_)));
    }

    #[test]
    fn test_load_malformed_file_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        fs::write(&path, "{\"balances\": [1, 2]}").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, GenesisError::Format(_)));
    }
}
