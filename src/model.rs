//! The double-entry domain model shared by the parser and the submission
//! layer: [`User`], [`Currency`], [`Account`], [`Split`] and [`Transaction`].

use crate::utils::format_minor_units;
use chrono::{DateTime, NaiveDate, Utc};
use getset::{CopyGetters, Getters};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the domain model itself. They carry no source location;
/// callers that know where the data came from attach it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A transaction without splits cannot be reversed.
    #[error("cannot reverse a transaction without splits")]
    EmptyTransaction,
    /// A split must be posted to at least one account.
    #[error("a split needs at least one account")]
    NoAccounts,
    /// An amount has a fraction smaller than the currency's minor unit.
    #[error("{amount} {currency} cannot be represented with {decimals} decimal places")]
    Precision {
        amount: String,
        currency: String,
        decimals: u32,
    },
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $t(Uuid);

        impl $t {
            /// Allocates a fresh, time-ordered identifier (UUIDv7).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $t {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a [`User`].
    UserId
);
uuid_id!(
    /// Identifier of a [`Split`].
    SplitId
);
uuid_id!(
    /// Identifier of a [`Transaction`].
    TransactionId
);

/// The person or process posting transactions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct User {
    #[getset(get_copy = "pub")]
    id: UserId,
    #[getset(get = "pub")]
    name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        User {
            id: UserId::new(),
            name: name.into(),
        }
    }
}

/// A currency code and the number of decimal places of its minor unit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, CopyGetters)]
pub struct Currency {
    #[getset(get = "pub")]
    name: String,
    #[getset(get_copy = "pub")]
    decimals: u32,
}

impl Currency {
    pub fn new(name: impl Into<String>, decimals: u32) -> Self {
        Currency {
            name: name.into(),
            decimals,
        }
    }

    /// Converts an amount expressed in hundredths of a unit, as produced by
    /// the parser, into minor units of this currency.
    ///
    /// Fails with [`ModelError::Precision`] if the result is not integral.
    pub fn to_minor_units(&self, hundredths: &BigRational) -> Result<BigInt, ModelError> {
        let factor = BigRational::new(BigInt::from(10u32).pow(self.decimals), BigInt::from(100u32));
        let scaled = hundredths * factor;
        if scaled.is_integer() {
            Ok(scaled.to_integer())
        } else {
            let unit = hundredths / BigRational::from_integer(BigInt::from(100u32));
            Err(ModelError::Precision {
                amount: unit.to_string(),
                currency: self.name.clone(),
                decimals: self.decimals,
            })
        }
    }

    /// Renders minor units with this currency's decimal places.
    pub fn format(&self, minor_units: &BigInt) -> String {
        format_minor_units(minor_units, self.decimals)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A ledger account. Two accounts are the same account iff their codes match.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters)]
#[getset(get = "pub")]
pub struct Account {
    code: String,
    name: String,
}

impl Account {
    pub fn new(code: &str, name: &str) -> Self {
        Account {
            code: code.trim().to_string(),
            name: name.trim().to_string(),
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// One signed leg of a [`Transaction`]. The amount is in minor units of
/// `currency`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Split {
    #[getset(get_copy = "pub")]
    id: SplitId,

    #[getset(get_copy = "pub")]
    date: NaiveDate,

    #[getset(get = "pub")]
    description: String,

    /// Returns the accounts this split is posted to. Never empty.
    #[getset(get = "pub")]
    accounts: Vec<Arc<Account>>,

    #[getset(get = "pub")]
    currency: Arc<Currency>,

    #[getset(get = "pub")]
    amount: BigInt,
}

impl Split {
    /// Fails with [`ModelError::NoAccounts`] if `accounts` is empty.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        accounts: Vec<Arc<Account>>,
        currency: Arc<Currency>,
        amount: BigInt,
    ) -> Result<Self, ModelError> {
        if accounts.is_empty() {
            return Err(ModelError::NoAccounts);
        }
        Ok(Split {
            id: SplitId::new(),
            date,
            description: description.into(),
            accounts,
            currency,
            amount,
        })
    }

    /// A copy of this split with a fresh id and the amount negated.
    pub fn negated(&self) -> Self {
        Split {
            id: SplitId::new(),
            amount: -&self.amount,
            ..self.clone()
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accounts = self
            .accounts
            .iter()
            .map(|account| account.code.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let width = f.width().unwrap_or(46);
        let num_str = format!("{} {}", self.currency.format(&self.amount), self.currency);
        let account_width = std::cmp::max(accounts.len() + 2, width.saturating_sub(num_str.len()));
        write!(f, "{:width$}{}", accounts, num_str, width = account_width)?;
        if !self.description.is_empty() {
            write!(f, " ; {}", self.description)?;
        }
        Ok(())
    }
}

/// A double-entry transaction. Splits can only be appended; corrections are
/// made by posting a [reversal](Transaction::reverse).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Transaction {
    #[getset(get_copy = "pub")]
    id: TransactionId,

    #[getset(get_copy = "pub")]
    postdate: DateTime<Utc>,

    #[getset(get = "pub")]
    poster: Arc<User>,

    #[getset(get = "pub")]
    description: String,

    #[getset(get = "pub")]
    splits: Vec<Split>,
}

impl Transaction {
    /// An empty transaction posted now.
    pub fn new(poster: Arc<User>) -> Self {
        Self::with_postdate(poster, Utc::now(), String::new())
    }

    pub fn with_postdate(
        poster: Arc<User>,
        postdate: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Transaction {
            id: TransactionId::new(),
            postdate,
            poster,
            description: description.into(),
            splits: Vec::new(),
        }
    }

    pub fn append_split(&mut self, split: Split) {
        self.splits.push(split);
    }

    /// Returns the sum of all split amounts and whether the transaction is
    /// balanced, i.e. has splits and sums to zero.
    pub fn balance(&self) -> (BigInt, bool) {
        let total: BigInt = self.splits.iter().map(|split| &split.amount).sum();
        let valid = !self.splits.is_empty() && total.is_zero();
        (total, valid)
    }

    /// Builds the transaction that cancels `self`: same splits with negated
    /// amounts, new ids, posted now by `poster`.
    pub fn reverse(&self, poster: Arc<User>) -> Result<Transaction, ModelError> {
        if self.splits.is_empty() {
            return Err(ModelError::EmptyTransaction);
        }
        let mut reversal = Transaction::with_postdate(poster, Utc::now(), self.description.clone());
        for split in &self.splits {
            reversal.append_split(split.negated());
        }
        Ok(reversal)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.postdate.date_naive(), self.description)?;
        let width = f.width().unwrap_or(50);
        for split in self.splits.iter() {
            write!(f, "\n    {:width$}", split, width = width.saturating_sub(4))?;
        }
        Ok(())
    }
}

/// Posts the reversal of `original` on behalf of `poster`. See
/// [`Transaction::reverse`].
pub fn reverse_transaction(original: &Transaction, poster: Arc<User>) -> Result<Transaction, ModelError> {
    original.reverse(poster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    fn aud() -> Arc<Currency> {
        Arc::new(Currency::new("AUD", 2))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2011, 3, 15).unwrap()
    }

    fn groceries() -> Transaction {
        let poster = Arc::new(User::new("tester"));
        let currency = aud();
        let mut txn = Transaction::new(poster);
        txn.append_split(Split::new(
            date(),
            "Whole Food Market",
            vec![Arc::new(Account::new("Expenses:Groceries", "Expenses:Groceries"))],
            currency.clone(),
            BigInt::from(7500),
        )
        .unwrap());
        txn.append_split(Split::new(
            date(),
            "Whole Food Market",
            vec![Arc::new(Account::new("Assets:Checking", "Assets:Checking"))],
            currency,
            BigInt::from(-7500),
        )
        .unwrap());
        txn
    }

    #[test]
    fn empty_transaction_is_not_balanced() {
        let txn = Transaction::new(Arc::new(User::new("tester")));
        assert_eq!(txn.balance(), (BigInt::zero(), false));
    }

    #[test]
    fn balanced_transaction() {
        assert_eq!(groceries().balance(), (BigInt::zero(), true));
    }

    #[test]
    fn unbalanced_total_is_reported() {
        let mut txn = groceries();
        txn.append_split(Split::new(
            date(),
            "",
            vec![Arc::new(Account::new("Expenses:Tips", "Expenses:Tips"))],
            aud(),
            BigInt::from(250),
        )
        .unwrap());
        assert_eq!(txn.balance(), (BigInt::from(250), false));
    }

    #[test]
    fn reverse_negates_every_split() {
        let original = groceries();
        let reversal = original.reverse(Arc::new(User::new("auditor"))).unwrap();
        assert_ne!(reversal.id(), original.id());
        assert_eq!(reversal.splits().len(), 2);
        for (orig, rev) in original.splits().iter().zip(reversal.splits()) {
            assert_ne!(orig.id(), rev.id());
            assert_eq!(rev.amount(), &-orig.amount());
            assert_eq!(rev.accounts(), orig.accounts());
            assert_eq!(rev.currency(), orig.currency());
            assert_eq!(rev.date(), orig.date());
            assert_eq!(rev.description(), orig.description());
        }
        assert_eq!(reversal.splits()[0].amount(), &BigInt::from(-7500));
        assert_eq!(reversal.splits()[1].amount(), &BigInt::from(7500));
        assert!(reversal.balance().1);
    }

    #[test]
    fn split_without_accounts_is_rejected() {
        let split = Split::new(date(), "", Vec::new(), aud(), BigInt::from(1));
        assert_eq!(split, Err(ModelError::NoAccounts));
    }

    #[test]
    fn reverse_of_empty_transaction_fails() {
        let poster = Arc::new(User::new("tester"));
        let txn = Transaction::new(poster.clone());
        assert_eq!(txn.reverse(poster), Err(ModelError::EmptyTransaction));
    }

    #[test]
    fn account_fields_are_trimmed() {
        let account = Account::new("  Assets:Cash ", "\tCash  ");
        assert_eq!(account.code(), "Assets:Cash");
        assert_eq!(account.name(), "Cash");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(User::new("a").id(), User::new("a").id());
        let id = TransactionId::new();
        assert_eq!(id.to_string().parse::<TransactionId>().unwrap(), id);
    }

    #[test]
    fn minor_units_follow_decimals() {
        let hundredths = BigRational::from_integer(BigInt::from(7550));
        assert_eq!(aud().to_minor_units(&hundredths).unwrap(), BigInt::from(7550));

        let jpy = Currency::new("JPY", 0);
        assert_eq!(
            jpy.to_minor_units(&BigRational::from_integer(BigInt::from(1200))).unwrap(),
            BigInt::from(12)
        );
        assert!(matches!(
            jpy.to_minor_units(&hundredths),
            Err(ModelError::Precision { decimals: 0, .. })
        ));

        let btc = Currency::new("BTC", 8);
        assert_eq!(
            btc.to_minor_units(&BigRational::one()).unwrap(),
            BigInt::from(1_000_000)
        );
    }

    #[test]
    fn fractional_hundredths_are_rejected() {
        let third = BigRational::new(BigInt::from(100), BigInt::from(3));
        assert!(aud().to_minor_units(&third).is_err());
    }
}
