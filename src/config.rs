//! Settings consumed by [`Ledger::from_files`](crate::Ledger::from_files).

use crate::model::Currency;
use getset::{CopyGetters, Getters};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Currency used for lines that do not name one.
pub const DEFAULT_CURRENCY: &str = "AUD";

/// Decimal places of a currency missing from [`LedgerConfig::decimals`].
pub const DEFAULT_DECIMALS: u32 = 2;

/// Name of the [`User`](crate::User) posting assembled transactions.
pub const DEFAULT_POSTER: &str = "ledger";

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct LedgerConfig {
    /// Returns the currency assumed for lines without a currency code.
    #[getset(get = "pub")]
    default_currency: String,

    /// Returns the decimal places of known currencies.
    #[getset(get = "pub")]
    decimals: HashMap<String, u32>,

    /// Returns the name of the poster of assembled transactions.
    #[getset(get = "pub")]
    poster: String,

    /// Returns the maximum number of files assembled in parallel.
    #[getset(get_copy = "pub")]
    threads: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            default_currency: DEFAULT_CURRENCY.to_string(),
            decimals: HashMap::new(),
            poster: DEFAULT_POSTER.to_string(),
            threads: num_cpus::get(),
        }
    }
}

impl LedgerConfig {
    pub fn with_default_currency(mut self, name: impl Into<String>) -> Self {
        self.default_currency = name.into();
        self
    }

    pub fn with_decimals(mut self, name: impl Into<String>, decimals: u32) -> Self {
        self.decimals.insert(name.into(), decimals);
        self
    }

    pub fn with_poster(mut self, name: impl Into<String>) -> Self {
        self.poster = name.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Returns the [`Currency`] called `name`, or the default currency if
    /// `name` is empty.
    pub fn currency(&self, name: &str) -> Currency {
        let name = if name.is_empty() {
            self.default_currency.as_str()
        } else {
            name
        };
        let decimals = self.decimals.get(name).copied().unwrap_or(DEFAULT_DECIMALS);
        Currency::new(name, decimals)
    }
}
