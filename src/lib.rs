//! # tally
//!
//! tally reads plain-text ledger files into balanced double-entry
//! transactions.
//!
//! A ledger file is a list of transactions separated by blank lines. Each
//! transaction starts with a date and a payee, followed by one line per
//! account. One account per transaction may omit its amount; it is inferred
//! so that the transaction sums to zero.
//!
//! ```text
//! include accounts/*.ledger
//!
//! 2011-03-15 Whole Food Market
//!     Expenses:Groceries   75.00
//!     Assets:Checking            ; inferred as -75.00
//! ```
//!
//! [`Ledger::from_files`] assembles any number of such files in parallel.
#![doc(html_root_url = "https://docs.rs/tally/0.1.0")]

mod assembly;
mod config;
mod ledger;
mod model;
pub mod parse;
pub mod utils;

pub use config::*;
pub use ledger::*;
pub use model::*;

pub use chrono::NaiveDate as Date;
pub use num_bigint::BigInt;
pub use num_rational::BigRational;
