use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use statement_ingest::{
    get_account_stats, get_all_transactions, get_transactions_by_account, init_tracing, verify_count,
    Config, ImportService, SqliteStore, StoredTransaction,
};

#[derive(Parser, Debug)]
#[command(name = "statement-ingest", version, about = "Bank statement ingestion → canonical transactions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the bank codes that have an adapter
    Banks,

    /// Ingest a statement and print the records without storing them
    Preview {
        /// Bank code, exactly as registered (BPI, CGD, Revolut)
        #[arg(long)]
        bank: String,

        /// Statement file named bankcode_accountid_YYYYMMDD.ext
        #[arg(long)]
        file: PathBuf,

        /// Print JSON instead of one line per record
        #[arg(long)]
        json: bool,
    },

    /// Ingest a statement into the SQLite database (re-imports skip duplicates)
    Import {
        #[arg(long)]
        bank: String,

        #[arg(long)]
        file: PathBuf,

        /// Database path (default: INGEST_DB_PATH or transactions.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List stored transactions
    List {
        /// Only this account
        #[arg(long)]
        account: Option<String>,

        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Per-account totals
    Stats {
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Ingest a statement and POST every record to a remote API
    #[cfg(feature = "delivery")]
    Deliver {
        #[arg(long)]
        bank: String,

        #[arg(long)]
        file: PathBuf,

        /// Endpoint (default: INGEST_DELIVERY_URL)
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    let service = ImportService::default();

    match cli.command {
        Command::Banks => {
            println!("🏦 Supported banks:");
            for bank in service.ingestor().registry().banks() {
                println!("   • {}", bank);
            }
        }

        Command::Preview { bank, file, json } => run_preview(&service, &bank, &file, json)?,

        Command::Import { bank, file, db } => {
            let db_path = db.unwrap_or_else(|| config.db_path.clone());
            run_import(&service, &bank, &file, &db_path)?;
        }

        Command::List { account, db } => {
            let db_path = db.unwrap_or_else(|| config.db_path.clone());
            run_list(&db_path, account.as_deref())?;
        }

        Command::Stats { db } => {
            let db_path = db.unwrap_or_else(|| config.db_path.clone());
            run_stats(&db_path)?;
        }

        #[cfg(feature = "delivery")]
        Command::Deliver { bank, file, url } => {
            let Some(url) = url.or_else(|| config.delivery_url.clone()) else {
                anyhow::bail!("No delivery URL: pass --url or set INGEST_DELIVERY_URL");
            };
            run_deliver(&service, &bank, &file, &url)?;
        }
    }

    Ok(())
}

fn run_preview(service: &ImportService, bank: &str, file: &Path, json: bool) -> Result<()> {
    let records = service
        .ingestor()
        .ingest(bank, file)
        .with_context(|| format!("Failed to ingest {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!("📄 {} ({} records)", file.display(), records.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for record in &records {
        println!("{}", record);
    }

    Ok(())
}

fn run_import(service: &ImportService, bank: &str, file: &Path, db_path: &Path) -> Result<()> {
    println!("🗄️  Import: {} → {}", file.display(), db_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut store = open_store(db_path)?;
    let summary = service
        .import(bank, file, &mut store)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("✓ Read: {} transactions", summary.received);
    println!("✓ Inserted: {} transactions", summary.inserted);
    println!("✓ Skipped duplicates: {}", summary.duplicates());

    let count = verify_count(store.conn())?;
    println!("✓ Database contains {} transactions", count);

    Ok(())
}

fn run_list(db_path: &Path, account: Option<&str>) -> Result<()> {
    let store = open_store(db_path)?;
    let transactions: Vec<StoredTransaction> = match account {
        Some(account) => get_transactions_by_account(store.conn(), account)?,
        None => get_all_transactions(store.conn())?,
    };

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    for tx in &transactions {
        println!("{}", tx.record);
    }
    println!("\n{} transactions", transactions.len());

    Ok(())
}

fn run_stats(db_path: &Path) -> Result<()> {
    let store = open_store(db_path)?;
    let stats = get_account_stats(store.conn())?;

    println!("📊 Accounts");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for stat in &stats {
        let range = match (stat.first_date, stat.last_date) {
            (Some(first), Some(last)) => format!("{} - {}", first, last),
            _ => "no dates".to_string(),
        };
        println!(
            "{:<8} {:<20} {:>5} tx   +{:>12}   -{:>12}   {}",
            stat.source, stat.account_id, stat.transaction_count, stat.total_credits, stat.total_debits, range
        );
    }

    Ok(())
}

#[cfg(feature = "delivery")]
fn run_deliver(service: &ImportService, bank: &str, file: &Path, url: &str) -> Result<()> {
    use statement_ingest::HttpDelivery;

    println!("📤 Delivering {} → {}", file.display(), url);

    let delivery = HttpDelivery::new(url)?;
    let summary = service
        .deliver(bank, file, &delivery)
        .with_context(|| format!("Failed to ingest {}", file.display()))?;

    println!("✓ Sent: {}", summary.sent);
    for (index, error) in &summary.failed {
        eprintln!("❌ Record {}: {}", index, error);
    }

    if !summary.failed.is_empty() {
        anyhow::bail!("{} of {} records were not delivered", summary.failed.len(), summary.total());
    }

    Ok(())
}

fn open_store(db_path: &Path) -> Result<SqliteStore> {
    SqliteStore::open(db_path).with_context(|| format!("Failed to open database {}", db_path.display()))
}
