use log::info;
use thiserror::Error;

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::block::BlockEnvelope;
use super::genesis;

const DATABASE_DIR: &str = "database";
const GENESIS_FILE: &str = "genesis.json";
const BLOCKS_FILE: &str = "block.db";

/// Errors that can occur during block log operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Block log I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt block log record at line {line}: {source}")]
    Corrupt {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Failed to encode block envelope: {0}")]
    Encode(serde_json::Error),
}

/// Append-only storage for block envelopes
///
/// One JSON document per line, in append order. Records are written once and
/// never rewritten or deleted; the only operations are appending a new
/// envelope and replaying the file from the start.
#[derive(Debug)]
pub struct BlockStore {
    file: File,
}

impl BlockStore {
    /// Opens the block log at `path`, creating an empty one if none exists
    ///
    /// The file is opened in append mode: writes always land at the end of
    /// the file regardless of the read cursor used by replay.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        Ok(BlockStore { file })
    }

    /// Replays every stored envelope, in file order
    ///
    /// Returns a lazy iterator over the records. Re-seeks to the start of
    /// the file, so calling `replay` again restarts from the first record. A
    /// malformed line yields [`StorageError::Corrupt`] with its line number;
    /// callers bootstrapping a ledger must treat that as fatal rather than
    /// skip the record, or balances would desynchronize from the chain.
    pub fn replay(&mut self) -> Result<Replay<'_>, StorageError> {
        self.file.seek(SeekFrom::Start(0))?;

        Ok(Replay {
            lines: BufReader::new(&self.file).lines(),
            line: 0,
        })
    }

    /// Appends one envelope as a newline-terminated record
    ///
    /// The record is fsynced before returning: a successful append is
    /// durable, and a persist must not advance its in-memory chain pointer
    /// until that point.
    pub fn append(&mut self, envelope: &BlockEnvelope) -> Result<(), StorageError> {
        let mut record = serde_json::to_vec(envelope).map_err(StorageError::Encode)?;
        record.push(b'\n');

        self.file.write_all(&record)?;
        self.file.sync_all()?;

        Ok(())
    }
}

/// Lazy iterator over the stored envelopes, produced by [`BlockStore::replay`]
pub struct Replay<'a> {
    lines: io::Lines<BufReader<&'a File>>,
    line: usize,
}

impl Iterator for Replay<'_> {
    type Item = Result<BlockEnvelope, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.lines.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(StorageError::Io(err))),
        };
        self.line += 1;

        match serde_json::from_str(&record) {
            Ok(envelope) => Some(Ok(envelope)),
            Err(err) => Some(Err(StorageError::Corrupt {
                line: self.line,
                source: err,
            })),
        }
    }
}

/// The database directory under a data directory
pub fn database_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_DIR)
}

/// Path of the genesis file under a data directory
pub fn genesis_file_path(data_dir: &Path) -> PathBuf {
    database_dir(data_dir).join(GENESIS_FILE)
}

/// Path of the block log under a data directory
pub fn blocks_file_path(data_dir: &Path) -> PathBuf {
    database_dir(data_dir).join(BLOCKS_FILE)
}

/// Prepares a data directory for first use
///
/// If the genesis file already exists the directory is left untouched.
/// Otherwise creates the database directory, writes the default genesis
/// document, and creates an empty block log.
pub fn init_data_dir(data_dir: &Path) -> Result<(), StorageError> {
    if genesis_file_path(data_dir).exists() {
        return Ok(());
    }

    info!("Initializing fresh data directory at {}", data_dir.display());

    fs::create_dir_all(database_dir(data_dir))?;
    genesis::write_default(&genesis_file_path(data_dir))?;
    fs::write(blocks_file_path(data_dir), b"")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, Block, Hash, Transaction};
    use tempfile::tempdir;

    fn sample_envelope(value: u64) -> BlockEnvelope {
        let block = Block::new(
            Hash::ZERO,
            value,
            vec![Transaction::Reward {
                to: Account::new("miner"),
                value,
            }],
        );

        BlockEnvelope::seal(block).unwrap()
    }

    #[test]
    fn test_open_creates_missing_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("block.db");

        let mut store = BlockStore::open(&path).unwrap();
        assert!(path.exists());

        assert_eq!(store.replay().unwrap().count(), 0);
    }

    #[test]
    fn test_append_then_replay_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("block.db");
        let mut store = BlockStore::open(&path).unwrap();

        let first = sample_envelope(1);
        let second = sample_envelope(2);
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        let replayed: Vec<_> = store
            .replay()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(replayed, vec![first, second]);
    }

    #[test]
    fn test_replay_is_restartable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("block.db");
        let mut store = BlockStore::open(&path).unwrap();

        store.append(&sample_envelope(1)).unwrap();
        store.append(&sample_envelope(2)).unwrap();

        assert_eq!(store.replay().unwrap().count(), 2);
        assert_eq!(store.replay().unwrap().count(), 2);
    }

    #[test]
    fn test_append_writes_one_line_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("block.db");
        let mut store = BlockStore::open(&path).unwrap();

        store.append(&sample_envelope(1)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with('\n'));
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn test_malformed_line_reports_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("block.db");
        let mut store = BlockStore::open(&path).unwrap();

        store.append(&sample_envelope(1)).unwrap();
        {
            let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
            raw.write_all(b"not a block\n").unwrap();
        }

        let mut replay = store.replay().unwrap();
        assert!(replay.next().unwrap().is_ok());

        match replay.next().unwrap() {
            Err(StorageError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption error, got {:?}", other),
        }
    }

    #[test]
    fn test_init_data_dir_is_idempotent() {
        let dir = tempdir().unwrap();

        init_data_dir(dir.path()).unwrap();
        assert!(genesis_file_path(dir.path()).exists());
        assert!(blocks_file_path(dir.path()).exists());

        // Seed a record, then re-init: existing data must be left untouched.
        let mut store = BlockStore::open(&blocks_file_path(dir.path())).unwrap();
        store.append(&sample_envelope(1)).unwrap();

        init_data_dir(dir.path()).unwrap();
        assert_eq!(store.replay().unwrap().count(), 1);
    }
}
