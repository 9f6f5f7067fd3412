use super::parser::{AccountChange, ParsedTransaction, MINOR_UNIT_SCALE};
use crate::{utils::format_minor_units, Error, ErrorType};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

fn format_hundredths(number: &BigRational) -> String {
    if number.is_integer() {
        format_minor_units(&number.to_integer(), 2)
    } else {
        (number / BigRational::from_integer(BigInt::from(MINOR_UNIT_SCALE))).to_string()
    }
}

fn format_residuals(residuals: &[(String, BigRational)]) -> String {
    residuals
        .iter()
        .map(|(currency, number)| {
            if currency.is_empty() {
                format_hundredths(number)
            } else {
                format!("{} {}", format_hundredths(number), currency)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Sums the balances of `changes` per currency, in order of first appearance.
fn per_currency_change(changes: &[AccountChange]) -> Vec<(String, BigRational)> {
    let mut sums: Vec<(String, BigRational)> = Vec::new();
    for change in changes {
        if let Some(balance) = &change.balance {
            match sums.iter_mut().find(|(currency, _)| *currency == change.currency) {
                Some((_, sum)) => *sum += balance,
                None => sums.push((change.currency.clone(), balance.clone())),
            }
        }
    }
    sums
}

/// Checks that `txn` balances, filling in the one account change without a
/// balance.
///
/// Changes without a currency code are first given `default_currency`, so
/// `10 AUD` and `-10` cancel when `AUD` is the default. An empty
/// `default_currency` leaves them as their own group.
///
/// The blank change receives the negated sum of the others. If the others
/// leave several currencies unbalanced, the blank change is replaced by one
/// change per unbalanced currency.
pub fn resolve(txn: &mut ParsedTransaction, default_currency: &str) -> Result<(), Error> {
    if !default_currency.is_empty() {
        for change in txn.account_changes.iter_mut() {
            if change.currency.is_empty() {
                change.currency = default_currency.to_string();
            }
        }
    }
    if txn.account_changes.is_empty() {
        return Err(Error {
            msg: format!("Transaction {} has no accounts.", txn.payee),
            src: txn.src.clone(),
            r#type: ErrorType::UnbalancedTransaction,
        });
    }
    let mut incomplete: Option<usize> = None;
    for (index, change) in txn.account_changes.iter().enumerate() {
        if change.balance.is_some() {
            continue;
        }
        if incomplete.is_some() {
            return Err(Error {
                msg: format!("Cannot infer the amounts for two accounts: {}.", change.name),
                src: change.src.clone(),
                r#type: ErrorType::AmbiguousBalance,
            });
        }
        incomplete = Some(index);
    }
    let sums = per_currency_change(&txn.account_changes);
    let not_balanced = sums
        .iter()
        .filter(|(_, number)| !number.is_zero())
        .cloned()
        .collect::<Vec<_>>();

    match incomplete {
        None if not_balanced.is_empty() => Ok(()),
        None => Err(Error {
            msg: format!("Transaction not balanced: {}", format_residuals(&not_balanced)),
            src: txn.src.clone(),
            r#type: ErrorType::UnbalancedTransaction,
        }),
        Some(index) => {
            let blank = txn.account_changes.remove(index);
            let inferred = if not_balanced.is_empty() {
                let currency = sums
                    .first()
                    .map(|(currency, _)| currency.clone())
                    .unwrap_or_default();
                vec![AccountChange {
                    currency,
                    balance: Some(BigRational::zero()),
                    ..blank
                }]
            } else {
                not_balanced
                    .into_iter()
                    .map(|(currency, number)| AccountChange {
                        currency,
                        balance: Some(-number),
                        ..blank.clone()
                    })
                    .collect()
            };
            txn.account_changes.splice(index..index, inferred);
            Ok(())
        }
    }
}
