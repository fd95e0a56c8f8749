use chrono::Utc;
use log::info;
use thiserror::Error;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::account::Account;
use super::block::{Block, BlockEnvelope, Hash, HashError};
use super::genesis::{self, GenesisError};
use super::storage::{self, BlockStore, StorageError};
use super::transaction::Transaction;

/// Errors that can occur during ledger state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Insufficient balance: account {account} holds {balance}, transaction value {value}")]
    InsufficientBalance {
        account: Account,
        balance: u64,
        value: u64,
    },

    #[error("Balance overflow: account {account} cannot hold the credited value")]
    BalanceOverflow { account: Account },

    #[error("Genesis error: {0}")]
    Genesis(#[from] GenesisError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Hash error: {0}")]
    Hash(#[from] HashError),

    #[error("Stored hash {stored} does not match recomputed hash {computed}")]
    HashMismatch { stored: Hash, computed: Hash },
}

/// The ledger state engine
///
/// Owns the account balances, the mempool of accepted-but-unpersisted
/// transactions, the hash of the latest persisted block, and the block log.
/// The state is reconstructed deterministically from genesis plus log replay
/// and is the single source of truth for balance queries.
///
/// The mempool is unbounded; callers needing backpressure must bound their
/// own submissions.
///
/// `State` provides no synchronization of its own; concurrent callers go
/// through [`Ledger`], which serializes every operation behind one mutex.
#[derive(Debug)]
pub struct State {
    balances: BTreeMap<Account, u64>,
    mempool: Vec<Transaction>,
    latest_block_hash: Hash,
    store: BlockStore,
}

impl State {
    /// Bootstraps the ledger from a data directory
    ///
    /// Initializes the directory on first run (default genesis, empty block
    /// log), loads the genesis balances, and replays every persisted block.
    /// Any replay failure is fatal: it indicates a corrupted or tampered
    /// log, not a recoverable runtime condition.
    pub fn from_disk(data_dir: &Path) -> Result<Self, StateError> {
        storage::init_data_dir(data_dir)?;

        let gen = genesis::load(&storage::genesis_file_path(data_dir))?;
        let store = BlockStore::open(&storage::blocks_file_path(data_dir))?;

        State::bootstrap(gen.balances, store)
    }

    /// Bootstraps the ledger from genesis balances and an opened block log
    ///
    /// Applies each replayed envelope's block in order through the same
    /// apply rule used for live transactions, and adopts the stored hash of
    /// the last envelope as the latest block hash. Stored hashes are trusted
    /// on read; see [`State::verify`] for the opt-in integrity check.
    pub fn bootstrap(
        genesis_balances: BTreeMap<Account, u64>,
        store: BlockStore,
    ) -> Result<Self, StateError> {
        let mut state = State {
            balances: genesis_balances,
            mempool: Vec::new(),
            latest_block_hash: Hash::ZERO,
            store,
        };

        state.replay_log()?;

        Ok(state)
    }

    fn replay_log(&mut self) -> Result<(), StateError> {
        let mut replayed = 0usize;

        for envelope in self.store.replay()? {
            let envelope = envelope?;

            for tx in &envelope.block.payload {
                apply_tx(&mut self.balances, tx)?;
            }

            self.latest_block_hash = envelope.hash;
            replayed += 1;
        }

        if replayed > 0 {
            info!(
                "Replayed {} block(s); latest block hash {}",
                replayed, self.latest_block_hash
            );
        }

        Ok(())
    }

    /// Validates and applies one transaction, buffering it in the mempool
    ///
    /// The sole admission gate for new transactions. Fails with
    /// [`StateError::InsufficientBalance`] if a transfer exceeds the
    /// sender's balance and with [`StateError::BalanceOverflow`] if the
    /// recipient's balance would no longer fit in a `u64`; on either
    /// failure neither balances nor mempool change.
    pub fn add_tx(&mut self, tx: Transaction) -> Result<(), StateError> {
        apply_tx(&mut self.balances, &tx)?;
        self.mempool.push(tx);

        Ok(())
    }

    /// Applies every transaction of an externally-assembled block, in
    /// payload order, via [`State::add_tx`]
    ///
    /// Fails with the first inner apply error. The block's own header is
    /// ignored: the batch lands in the mempool, and the next [`State::persist`]
    /// re-headers it with the current latest hash and a fresh timestamp.
    pub fn add_block(&mut self, block: Block) -> Result<(), StateError> {
        for tx in block.payload {
            self.add_tx(tx)?;
        }

        Ok(())
    }

    /// Snapshots the mempool into a new block and appends it to the log
    ///
    /// The block carries `parent = latest_block_hash` and the current wall
    /// clock time. Only after the append is durable does the latest hash
    /// advance and the mempool clear; on any hash or I/O failure the
    /// in-memory state is left exactly as it was, consistent with disk. An
    /// empty mempool still produces an empty-payload block.
    pub fn persist(&mut self) -> Result<Hash, StateError> {
        let block = Block::new(
            self.latest_block_hash,
            Utc::now().timestamp() as u64,
            self.mempool.clone(),
        );
        let envelope = BlockEnvelope::seal(block)?;

        self.store.append(&envelope)?;

        // The record is on disk; the in-memory pointer may now advance.
        self.latest_block_hash = envelope.hash;
        self.mempool.clear();

        info!(
            "Persisted block {} with {} transaction(s)",
            envelope.hash,
            envelope.block.payload.len()
        );

        Ok(envelope.hash)
    }

    /// Re-reads the whole log, recomputing every block's hash and comparing
    /// it with the stored one
    ///
    /// Returns the number of verified blocks. This is the opt-in
    /// counterpart to the trust-on-write replay done at bootstrap.
    pub fn verify(&mut self) -> Result<usize, StateError> {
        let mut verified = 0usize;

        for envelope in self.store.replay()? {
            let envelope = envelope?;
            let computed = envelope.block.hash()?;

            if computed != envelope.hash {
                return Err(StateError::HashMismatch {
                    stored: envelope.hash,
                    computed,
                });
            }

            verified += 1;
        }

        Ok(verified)
    }

    /// Current balance of every known account
    pub fn balances(&self) -> &BTreeMap<Account, u64> {
        &self.balances
    }

    /// Transactions accepted since the last successful persist
    #[cfg(test)]
    pub fn mempool(&self) -> &[Transaction] {
        &self.mempool
    }

    /// Hash of the last persisted block, or the zero hash for a fresh chain
    pub fn latest_block_hash(&self) -> Hash {
        self.latest_block_hash
    }
}

/// The balance mutation rule, shared by live admission and log replay
///
/// A reward mints value into its recipient. A transfer requires the sender's
/// balance to cover the value, and any credit must fit in a `u64`. Both
/// checks pass before either balance is written; there is no speculative
/// mutation and no rollback.
fn apply_tx(balances: &mut BTreeMap<Account, u64>, tx: &Transaction) -> Result<(), StateError> {
    match tx {
        Transaction::Reward { to, value } => {
            let held = balances.get(to).copied().unwrap_or(0);
            let credited = held
                .checked_add(*value)
                .ok_or_else(|| StateError::BalanceOverflow { account: to.clone() })?;

            balances.insert(to.clone(), credited);
        }
        Transaction::Transfer { from, to, value } => {
            let available = balances.get(from).copied().unwrap_or(0);

            if available < *value {
                return Err(StateError::InsufficientBalance {
                    account: from.clone(),
                    balance: available,
                    value: *value,
                });
            }

            let debited = available - value;
            // A self-transfer credits the already-debited balance.
            let held = if to == from {
                debited
            } else {
                balances.get(to).copied().unwrap_or(0)
            };
            let credited = held
                .checked_add(*value)
                .ok_or_else(|| StateError::BalanceOverflow { account: to.clone() })?;

            balances.insert(from.clone(), debited);
            balances.insert(to.clone(), credited);
        }
    }

    Ok(())
}

/// A clonable handle to the ledger state engine
///
/// Every operation (transaction and block admission, persist, verification,
/// balance and latest-hash reads) runs under a single mutex, so balances
/// mutation, mempool mutation, and log append appear atomic to external
/// observers. This is the only concurrency boundary the engine needs: one
/// instance exclusively owns its log file for the process lifetime.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: Arc<Mutex<State>>,
}

impl Ledger {
    /// Bootstraps the engine from a data directory; see [`State::from_disk`]
    pub fn from_disk(data_dir: &Path) -> Result<Self, StateError> {
        let state = State::from_disk(data_dir)?;

        Ok(Ledger {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Validates and buffers one transaction; see [`State::add_tx`]
    pub fn add_tx(&self, tx: Transaction) -> Result<(), StateError> {
        self.state.lock().unwrap().add_tx(tx)
    }

    /// Applies a block's transactions to the mempool; see [`State::add_block`]
    pub fn add_block(&self, block: Block) -> Result<(), StateError> {
        self.state.lock().unwrap().add_block(block)
    }

    /// Persists the mempool as a new block; see [`State::persist`]
    pub fn persist(&self) -> Result<Hash, StateError> {
        self.state.lock().unwrap().persist()
    }

    /// Runs the log integrity check; see [`State::verify`]
    pub fn verify(&self) -> Result<usize, StateError> {
        self.state.lock().unwrap().verify()
    }

    /// Snapshot of every account balance
    pub fn balances(&self) -> BTreeMap<Account, u64> {
        self.state.lock().unwrap().balances().clone()
    }

    /// Hash of the last persisted block
    pub fn latest_block_hash(&self) -> Hash {
        self.state.lock().unwrap().latest_block_hash()
    }
}
