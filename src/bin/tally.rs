use clap::{Parser, Subcommand};
use num_traits::Zero;
use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;
use tally::{BigInt, Currency, Ledger, LedgerConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_decimals(arg: &str) -> Result<(String, u32), String> {
    let (code, decimals) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=N, found {:?}", arg))?;
    let decimals = decimals
        .parse::<u32>()
        .map_err(|e| format!("invalid decimal places {:?}: {}", decimals, e))?;
    Ok((code.to_string(), decimals))
}

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    about = "Reads plain-text ledgers into balanced transactions.",
    version = VERSION,
)]
struct Cli {
    /// Currency of amounts without a currency code.
    #[arg(short = 'c', long = "currency", default_value = tally::DEFAULT_CURRENCY)]
    currency: String,
    /// Decimal places of a currency, e.g. JPY=0. Repeatable.
    #[arg(long, value_parser = parse_decimals)]
    decimals: Vec<(String, u32)>,
    /// Name of the user posting the transactions.
    #[arg(long, default_value = tally::DEFAULT_POSTER)]
    poster: String,
    /// Number of files read in parallel. Defaults to the number of CPUs.
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    #[arg(required = true)]
    files: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Only report errors.
    Check,
    /// Print every transaction.
    Print,
    /// List accounts and currencies.
    Accounts,
    /// Print the total of every account per currency.
    Balances,
}

impl Cli {
    fn config(&self) -> LedgerConfig {
        let mut config = LedgerConfig::default()
            .with_default_currency(self.currency.as_str())
            .with_poster(self.poster.as_str());
        for (code, decimals) in &self.decimals {
            config = config.with_decimals(code.as_str(), *decimals);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}

fn print(ledger: &Ledger) {
    for txn in ledger.transactions() {
        println!("{}\n", txn);
    }
}

fn accounts(ledger: &Ledger) {
    for account in ledger.accounts() {
        println!("{}", account);
    }
    println!();
    for currency in ledger.currencies() {
        println!("{} ({} decimals)", currency, currency.decimals());
    }
}

fn balances(ledger: &Ledger) {
    let mut sheet: BTreeMap<(String, String), (Arc<Currency>, BigInt)> = BTreeMap::new();
    for txn in ledger.transactions() {
        for split in txn.splits() {
            for account in split.accounts() {
                let key = (account.code().clone(), split.currency().name().clone());
                let entry = sheet
                    .entry(key)
                    .or_insert_with(|| (split.currency().clone(), BigInt::zero()));
                entry.1 += split.amount();
            }
        }
    }
    for ((account, _), (currency, number)) in sheet {
        if number.is_zero() {
            continue;
        }
        println!("{} {} {}", account, currency.format(&number), currency);
    }
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let args = Cli::parse();
    let (ledger, errors) = Ledger::from_files(&args.files, &args.config());
    for error in &errors {
        eprintln!("{}\n", error);
    }
    match args.command {
        Commands::Check => {
            println!(
                "{} transaction(s), {} account(s), {} error(s)",
                ledger.transactions().len(),
                ledger.accounts().len(),
                errors.len()
            );
        }
        Commands::Print => print(&ledger),
        Commands::Accounts => accounts(&ledger),
        Commands::Balances => balances(&ledger),
    }
    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
