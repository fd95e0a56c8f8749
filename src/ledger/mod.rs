// Ledger module
//
// This module contains the core ledger implementation including:
// - Account identifiers
// - Transaction structure
// - Block structure and content hashing
// - Genesis document
// - Block log storage
// - State engine with mempool and replay

pub mod account;
pub mod block;
pub mod genesis;
pub mod state;
pub mod storage;
pub mod transaction;

// Re-export main components for easier access
pub use account::Account;
pub use block::{Block, Hash};
pub use state::Ledger;
pub use transaction::Transaction;
// Genesis and storage internals are reached through the state engine
