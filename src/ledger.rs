use crate::assembly::assemble_file;
use crate::config::LedgerConfig;
use crate::model::{Account, Currency, Transaction, User};
use getset::Getters;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// A string wrapped in [`Arc`](std::sync::Arc)
/// representing the source file path.
pub type SrcFile = Arc<String>;

/// A line in a source file. Every parsed record and every error carries one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub file: SrcFile,
    pub line: usize,
}

impl Source {
    pub fn new(file: SrcFile, line: usize) -> Self {
        Source { file, line }
    }

    /// The source of the line following this one.
    pub fn next_line(&self) -> Self {
        Source {
            file: self.file.clone(),
            line: self.line + 1,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Kinds of errors that `tally` encounters while turning ledger files into
/// transactions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// A file includes itself, directly or through other files.
    IncludeCycle,
    /// An `include` line does not have exactly one argument, or the argument
    /// is not a valid glob pattern.
    MalformedInclude,
    /// A ledger file or an included file does not exist.
    FileNotFound,
    /// A ledger file exists but cannot be read.
    FileRead,
    /// The first word of a header line is not a date.
    DateParse,
    /// A header line has no payee.
    HeaderParse,
    /// An amount or amount expression is malformed.
    AmountParse,
    /// More than one account in a transaction has no amount.
    AmbiguousBalance,
    /// The amounts of a transaction do not sum to zero.
    UnbalancedTransaction,
    /// An amount is finer than the minor unit of its currency.
    Precision,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::IncludeCycle => "include cycle",
            ErrorType::MalformedInclude => "malformed include",
            ErrorType::FileNotFound => "file not found",
            ErrorType::FileRead => "file read error",
            ErrorType::DateParse => "invalid date",
            ErrorType::HeaderParse => "invalid header",
            ErrorType::AmountParse => "invalid amount",
            ErrorType::AmbiguousBalance => "ambiguous balance",
            ErrorType::UnbalancedTransaction => "unbalanced transaction",
            ErrorType::Precision => "precision error",
        };
        write!(f, "{}", name)
    }
}

/// Contains the full information of an error.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    pub msg: String,
    pub src: Source,
    pub r#type: ErrorType,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}\n  {}", self.r#type, self.msg, self.src)
    }
}

impl std::error::Error for Error {}

/// Balanced transactions assembled from one or more ledger files, plus the
/// accounts and currencies they reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct Ledger {
    /// Returns the transactions, sorted by postdate.
    #[getset(get = "pub")]
    pub(crate) transactions: Vec<Transaction>,

    /// Returns every referenced account once, in order of first reference.
    #[getset(get = "pub")]
    pub(crate) accounts: Vec<Arc<Account>>,

    /// Returns every referenced currency once, in order of first reference.
    #[getset(get = "pub")]
    pub(crate) currencies: Vec<Arc<Currency>>,
}

impl Ledger {
    pub fn from_file<P: AsRef<Path>>(path: P, config: &LedgerConfig) -> (Self, Vec<Error>) {
        Self::from_files(&[path], config)
    }

    /// Assembles every file in `paths` independently, on up to
    /// [`LedgerConfig::threads`] threads, and merges the results.
    ///
    /// Each file stops at its first error; the transactions it produced before
    /// the error are kept. At most one error is returned per file, in the
    /// order of `paths`.
    pub fn from_files<P: AsRef<Path>>(paths: &[P], config: &LedgerConfig) -> (Self, Vec<Error>) {
        let queue: VecDeque<(usize, PathBuf)> = paths
            .iter()
            .map(|path| path.as_ref().to_path_buf())
            .enumerate()
            .collect();
        let num_workers = config.threads().clamp(1, queue.len().max(1));
        debug!("assembling {} file(s) on {} worker(s)", queue.len(), num_workers);
        let poster = Arc::new(User::new(config.poster().as_str()));
        let queue = Mutex::new(queue);
        let results = Mutex::new(Vec::with_capacity(paths.len()));
        std::thread::scope(|scope| {
            for id in 0..num_workers {
                let queue = &queue;
                let results = &results;
                let poster = &poster;
                scope.spawn(move || {
                    while let Some((index, path)) = pop_task(queue) {
                        debug!("worker {} takes {}", id, path.display());
                        let result = assemble_file(&path, config, poster);
                        lock(results).push((index, result));
                    }
                });
            }
        });
        let mut results = results.into_inner().unwrap_or_else(|e| e.into_inner());
        results.sort_by_key(|(index, _)| *index);

        let mut ledger = Ledger::default();
        let mut errors = Vec::new();
        let mut seen_accounts = HashSet::new();
        let mut seen_currencies = HashSet::new();
        for (_, assembled) in results {
            ledger.transactions.extend(assembled.transactions);
            for account in assembled.accounts {
                if seen_accounts.insert(account.code().clone()) {
                    ledger.accounts.push(account);
                }
            }
            for currency in assembled.currencies {
                if seen_currencies.insert(currency.name().clone()) {
                    ledger.currencies.push(currency);
                }
            }
            errors.extend(assembled.error);
        }
        ledger.transactions.sort_by_key(|txn| txn.postdate());
        (ledger, errors)
    }
}

fn pop_task(queue: &Mutex<VecDeque<(usize, PathBuf)>>) -> Option<(usize, PathBuf)> {
    lock(queue).pop_front()
}

/// Locks `mutex`, ignoring poisoning: a worker that panicked never leaves
/// the queue or the results half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
