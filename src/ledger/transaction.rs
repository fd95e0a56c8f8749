use serde::{Deserialize, Serialize};

use super::account::Account;

/// The `data` value that marks a transaction as a reward on the wire
pub const REWARD_DATA: &str = "reward";

/// Represents a value transfer in the ledger
///
/// A transaction is either a plain transfer, debiting the sender, or a
/// reward, which mints new value into the recipient with no originating
/// balance check. Only trusted internal callers should create rewards.
///
/// On the wire both variants share the historical JSON shape
/// `{"from", "to", "value", "data"}`: `data == "reward"` selects the
/// `Reward` variant on decode, anything else decodes as a `Transfer`. A
/// reward re-encodes self-addressed (`from` equal to `to`, the convention
/// used by every reward in existing logs); a transfer re-encodes with an
/// empty `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TxWire", into = "TxWire")]
pub enum Transaction {
    /// Moves `value` tokens from one account to another
    Transfer {
        from: Account,
        to: Account,
        value: u64,
    },

    /// Mints `value` new tokens into an account
    Reward { to: Account, value: u64 },
}

impl Transaction {
    /// Creates a new transaction from the wire fields
    ///
    /// Pure construction, no validation; validating against balances is the
    /// engine's job. `data == "reward"` yields a `Reward`; any other `data`
    /// yields a `Transfer` (free-text payloads carry no meaning).
    pub fn new(from: Account, to: Account, value: u64, data: &str) -> Self {
        if data == REWARD_DATA {
            Transaction::Reward { to, value }
        } else {
            Transaction::Transfer { from, to, value }
        }
    }
}

/// The persisted JSON shape shared by both transaction variants
#[derive(Serialize, Deserialize)]
struct TxWire {
    from: Account,
    to: Account,
    value: u64,
    data: String,
}

impl From<TxWire> for Transaction {
    fn from(wire: TxWire) -> Self {
        Transaction::new(wire.from, wire.to, wire.value, &wire.data)
    }
}

impl From<Transaction> for TxWire {
    fn from(tx: Transaction) -> Self {
        match tx {
            Transaction::Transfer { from, to, value } => TxWire {
                from,
                to,
                value,
                data: String::new(),
            },
            Transaction::Reward { to, value } => TxWire {
                from: to.clone(),
                to,
                value,
                data: REWARD_DATA.to_string(),
            },
        }
    }
}
