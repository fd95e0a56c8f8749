use chrono::Utc;
use clap::{Parser, Subcommand};

use std::path::{Path, PathBuf};

mod ledger;
mod node;

use ledger::transaction::REWARD_DATA;
use ledger::{Account, Block, Hash, Ledger, Transaction};

#[derive(Parser)]
#[command(name = "ledger_node")]
#[command(about = "An account-balance ledger over an append-only block log", long_about = None)]
struct Cli {
    /// Directory holding the database files
    #[arg(long, global = true, default_value = ".")]
    datadir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the ledger and serve the HTTP API
    Run {
        /// TCP port to listen on
        #[arg(long, default_value_t = node::DEFAULT_HTTP_PORT)]
        port: u16,
    },
    /// Interact with transactions (add)
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Seed the two historical demonstration blocks into the store
    Migrate,
    /// Recompute every stored block hash and compare it with the recorded one
    Verify,
}

#[derive(Subcommand)]
enum TxCommands {
    /// Add a new transaction to the ledger
    Add {
        /// From what account to send tokens
        #[arg(long)]
        from: String,

        /// To what account to send tokens
        #[arg(long)]
        to: String,

        /// How many tokens to send
        #[arg(long)]
        value: u64,

        /// Possible values: 'reward'
        #[arg(long, default_value = "")]
        data: String,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { port } => node::run(&cli.datadir, port).await,
        Commands::Tx { command } => match command {
            TxCommands::Add {
                from,
                to,
                value,
                data,
            } => tx_add(&cli.datadir, from, to, value, &data),
        },
        Commands::Migrate => migrate(&cli.datadir),
        Commands::Verify => verify(&cli.datadir),
    }
}

fn tx_add(datadir: &Path, from: String, to: String, value: u64, data: &str) -> anyhow::Result<()> {
    let ledger = Ledger::from_disk(datadir)?;

    let tx = Transaction::new(Account::new(from), Account::new(to), value, data);

    ledger.add_tx(tx)?;
    let hash = ledger.persist()?;

    println!("Transaction added to the ledger in block {}", hash);

    Ok(())
}

fn migrate(datadir: &Path) -> anyhow::Result<()> {
    let ledger = Ledger::from_disk(datadir)?;

    let block0 = Block::new(
        Hash::ZERO,
        Utc::now().timestamp() as u64,
        vec![
            Transaction::new(Account::new("guilospanck"), Account::new("guilospanck"), 3, ""),
            Transaction::new(
                Account::new("guilospanck"),
                Account::new("guilospanck"),
                700,
                REWARD_DATA,
            ),
        ],
    );

    ledger.add_block(block0)?;
    let block0_hash = ledger.persist()?;

    let block1 = Block::new(
        block0_hash,
        Utc::now().timestamp() as u64,
        vec![
            Transaction::new(Account::new("guilospanck"), Account::new("babayaga"), 2000, ""),
            Transaction::new(
                Account::new("guilospanck"),
                Account::new("guilospanck"),
                100,
                REWARD_DATA,
            ),
            Transaction::new(Account::new("babayaga"), Account::new("guilospanck"), 1, ""),
            Transaction::new(Account::new("babayaga"), Account::new("caesar"), 1000, ""),
            Transaction::new(Account::new("babayaga"), Account::new("guilospanck"), 50, ""),
            Transaction::new(
                Account::new("guilospanck"),
                Account::new("guilospanck"),
                600,
                REWARD_DATA,
            ),
        ],
    );

    ledger.add_block(block1)?;
    let block1_hash = ledger.persist()?;

    println!("Migrated block {}", block0_hash);
    println!("Migrated block {}", block1_hash);

    Ok(())
}

fn verify(datadir: &Path) -> anyhow::Result<()> {
    let ledger = Ledger::from_disk(datadir)?;

    let verified = ledger.verify()?;

    println!("Verified {} block(s)", verified);

    Ok(())
}
