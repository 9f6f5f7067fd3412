//! Turns one ledger file, and everything it includes, into domain
//! transactions.

use crate::config::LedgerConfig;
use crate::model::{Account, Currency, ModelError, Split, Transaction, User};
use crate::parse::{Includer, ParsedTransaction, Parser};
use crate::{Error, ErrorType, Source};
use chrono::{NaiveDateTime, NaiveTime, TimeZone, Utc};
use log::debug;
use num_rational::BigRational;
use num_traits::Zero;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The outcome of assembling one file: everything built before the first
/// error, and that error if there was one.
#[derive(Debug, Default)]
pub(crate) struct FileAssembly {
    pub transactions: Vec<Transaction>,
    pub accounts: Vec<Arc<Account>>,
    pub currencies: Vec<Arc<Currency>>,
    pub error: Option<Error>,
}

fn model_error(error: ModelError, src: &Source) -> Error {
    let r#type = match error {
        ModelError::Precision { .. } => ErrorType::Precision,
        ModelError::EmptyTransaction | ModelError::NoAccounts => ErrorType::UnbalancedTransaction,
    };
    Error {
        msg: error.to_string(),
        src: src.clone(),
        r#type,
    }
}

/// Interns accounts and currencies so every split shares them.
struct Assembler<'c> {
    config: &'c LedgerConfig,
    poster: Arc<User>,
    accounts: HashMap<String, Arc<Account>>,
    currencies: HashMap<String, Arc<Currency>>,
    output: FileAssembly,
}

impl<'c> Assembler<'c> {
    fn new(config: &'c LedgerConfig, poster: Arc<User>) -> Self {
        Assembler {
            config,
            poster,
            accounts: HashMap::new(),
            currencies: HashMap::new(),
            output: FileAssembly::default(),
        }
    }

    fn account(&mut self, name: &str) -> Arc<Account> {
        if let Some(account) = self.accounts.get(name) {
            return account.clone();
        }
        let account = Arc::new(Account::new(name, name));
        self.accounts.insert(name.to_string(), account.clone());
        self.output.accounts.push(account.clone());
        account
    }

    fn currency(&mut self, name: &str) -> Arc<Currency> {
        if let Some(currency) = self.currencies.get(name) {
            return currency.clone();
        }
        let currency = Arc::new(self.config.currency(name));
        self.currencies.insert(name.to_string(), currency.clone());
        if !self.output.currencies.iter().any(|c| c.name() == currency.name()) {
            self.output.currencies.push(currency.clone());
        }
        currency
    }

    fn convert(&mut self, parsed: ParsedTransaction) -> Result<Transaction, Error> {
        let midnight = NaiveDateTime::new(parsed.date, NaiveTime::MIN);
        let postdate = Utc.from_utc_datetime(&midnight);
        let mut txn = Transaction::with_postdate(self.poster.clone(), postdate, parsed.payee.as_str());
        for change in parsed.account_changes {
            let account = self.account(&change.name);
            let currency = self.currency(&change.currency);
            let hundredths = change.balance.unwrap_or_else(BigRational::zero);
            let amount = currency
                .to_minor_units(&hundredths)
                .map_err(|e| model_error(e, &change.src))?;
            let split = Split::new(parsed.date, change.description, vec![account], currency, amount)
                .map_err(|e| model_error(e, &change.src))?;
            txn.append_split(split);
        }
        Ok(txn)
    }

    fn run(mut self, path: &Path) -> FileAssembly {
        let records = match Includer::new().include(path) {
            Ok(records) => records,
            Err(error) => {
                self.output.error = Some(error);
                return self.output;
            }
        };
        let parser = Parser::new(records).with_default_currency(self.config.default_currency().as_str());
        for parsed in parser {
            match parsed.and_then(|parsed| self.convert(parsed)) {
                Ok(txn) => self.output.transactions.push(txn),
                Err(error) => {
                    self.output.error = Some(error);
                    break;
                }
            }
        }
        debug!(
            "{}: {} transaction(s), {} account(s)",
            path.display(),
            self.output.transactions.len(),
            self.output.accounts.len()
        );
        self.output
    }
}

/// Assembles the file at `path`, stopping at its first error.
pub(crate) fn assemble_file(path: &Path, config: &LedgerConfig, poster: &Arc<User>) -> FileAssembly {
    Assembler::new(config, poster.clone()).run(path)
}
