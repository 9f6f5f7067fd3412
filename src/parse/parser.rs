use super::amount::parse_amount;
use super::checker::resolve;
use super::include::Record;
use crate::{Date, Error, ErrorType, Source};
use log::{debug, trace};
use num_bigint::BigInt;
use num_rational::BigRational;
use std::sync::Arc;

/// Parsed amounts are stored in hundredths of a currency unit.
pub const MINOR_UNIT_SCALE: u32 = 100;

/// Date formats accepted in header lines, tried in order.
pub const DATE_FORMATS: [&str; 4] = ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d", "%d-%b-%Y"];

/// An `account  amount` line of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChange {
    pub name: String,
    /// The comment of the line, if any.
    pub description: String,
    /// The currency code of the amount; empty for the default currency.
    pub currency: String,
    /// The amount in hundredths of a unit. `None` until inferred.
    pub balance: Option<BigRational>,
    pub src: Source,
}

/// A transaction as written in the source, before it becomes a
/// [`Transaction`](crate::Transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub payee: String,
    pub date: Date,
    pub account_changes: Vec<AccountChange>,
    pub src: Source,
}

/// The classification of an account-change line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// A line without an amount.
    Account(String),
    /// A line with an amount, in units, and an optional currency code.
    AccountWithAmount(String, BigRational, String),
}

#[derive(Debug)]
enum ParserState {
    AwaitingHeader,
    InTransaction(ParsedTransaction),
}

/// Turns the records produced by an [`Includer`](super::Includer) into
/// balanced [`ParsedTransaction`]s.
///
/// The parser is an iterator that stops after yielding the first error.
pub struct Parser<I> {
    records: I,
    default_currency: String,
    next_src: Source,
    state: ParserState,
    done: bool,
}

impl<I: Iterator<Item = Record>> Parser<I> {
    pub fn new<R>(records: R) -> Self
    where
        R: IntoIterator<Item = Record, IntoIter = I>,
    {
        Parser {
            records: records.into_iter(),
            default_currency: String::new(),
            next_src: Source::new(Arc::new("<input>".to_string()), 1),
            state: ParserState::AwaitingHeader,
            done: false,
        }
    }

    /// Treats amounts without a currency code as `code` when balancing.
    pub fn with_default_currency(mut self, code: impl Into<String>) -> Self {
        self.default_currency = code.into();
        self
    }

    fn advance(&mut self) -> Source {
        let src = self.next_src.clone();
        self.next_src = src.next_line();
        src
    }

    fn finish(&self, mut txn: ParsedTransaction) -> Result<ParsedTransaction, Error> {
        resolve(&mut txn, &self.default_currency)?;
        debug!(
            "{}: {} {} with {} account(s)",
            txn.src,
            txn.date,
            txn.payee,
            txn.account_changes.len()
        );
        Ok(txn)
    }

    fn close(&mut self) -> Result<Option<ParsedTransaction>, Error> {
        match std::mem::replace(&mut self.state, ParserState::AwaitingHeader) {
            ParserState::InTransaction(txn) => self.finish(txn).map(Some),
            ParserState::AwaitingHeader => Ok(None),
        }
    }

    fn parse_line(&mut self, line: &str, src: Source) -> Result<Option<ParsedTransaction>, Error> {
        let (content, comment) = strip_comment(line);
        let content = content.trim();
        if content.is_empty() {
            return self.close();
        }
        if let ParserState::InTransaction(txn) = &mut self.state {
            let change = parse_account_change(content, comment, src)?;
            txn.account_changes.push(change);
        } else {
            self.state = ParserState::InTransaction(parse_header(content, src)?);
        }
        Ok(None)
    }
}

impl<I: Iterator<Item = Record>> Iterator for Parser<I> {
    type Item = Result<ParsedTransaction, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let result = match self.records.next() {
                Some(Record::Marker(src)) => {
                    self.next_src = src;
                    self.close()
                }
                Some(Record::Line(line)) => {
                    let src = self.advance();
                    self.parse_line(&line, src)
                }
                None => {
                    self.done = true;
                    self.close()
                }
            };
            match result {
                Ok(Some(txn)) => return Some(Ok(txn)),
                Ok(None) if self.done => return None,
                Ok(None) => {}
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

impl<I: Iterator<Item = Record>> std::iter::FusedIterator for Parser<I> {}

/// Splits `line` at the first `;` not preceded by a backslash. Returns the
/// content, with `\;` unescaped, and the trimmed comment.
pub fn strip_comment(line: &str) -> (String, &str) {
    let mut content = String::with_capacity(line.len());
    let mut chars = line.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some((_, ';'))) => {
                content.push(';');
                chars.next();
            }
            ';' => return (content, line[index + 1..].trim()),
            _ => content.push(c),
        }
    }
    (content, "")
}

/// Splits an account-change line into columns separated by two or more
/// spaces or by tabs. Empty columns are dropped.
pub fn split_columns(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let is_blank = |b: u8| b == b' ' || b == b'\t';
    let mut columns = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if !is_blank(bytes[i]) {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut has_tab = false;
        while i < bytes.len() && is_blank(bytes[i]) {
            has_tab |= bytes[i] == b'\t';
            i += 1;
        }
        if has_tab || i - run_start >= 2 {
            columns.push(&line[start..run_start]);
            start = i;
        }
    }
    columns.push(&line[start..]);
    columns
        .into_iter()
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .collect()
}

pub fn parse_date(date_str: &str) -> Option<Date> {
    DATE_FORMATS
        .iter()
        .find_map(|format| Date::parse_from_str(date_str, format).ok())
}

fn parse_header(content: &str, src: Source) -> Result<ParsedTransaction, Error> {
    let (date_str, payee) = match content.split_once(char::is_whitespace) {
        Some(parts) => parts,
        None => {
            return Err(Error {
                msg: format!("Expected a date and a payee, found {:?}.", content),
                src,
                r#type: ErrorType::HeaderParse,
            })
        }
    };
    let date = parse_date(date_str).ok_or_else(|| Error {
        msg: format!("Invalid date: {}.", date_str),
        src: src.clone(),
        r#type: ErrorType::DateParse,
    })?;
    trace!("{}: header {} {:?}", src, date, payee);
    Ok(ParsedTransaction {
        payee: payee.trim().to_string(),
        date,
        account_changes: Vec::new(),
        src,
    })
}

/// Classifies the columns of an account-change line.
pub fn classify_line(columns: &[&str], src: &Source) -> Result<LineKind, Error> {
    let (last, rest) = match columns.split_last() {
        Some(split) => split,
        None => return Ok(LineKind::Account(String::new())),
    };
    match parse_amount(last, src)? {
        Some(_) if rest.is_empty() => Err(Error {
            msg: format!("Missing account name before amount {}.", last),
            src: src.clone(),
            r#type: ErrorType::AmountParse,
        }),
        Some((amount, currency)) => Ok(LineKind::AccountWithAmount(rest.join(" "), amount, currency)),
        None => Ok(LineKind::Account(columns.join(" "))),
    }
}

fn parse_account_change(content: &str, comment: &str, src: Source) -> Result<AccountChange, Error> {
    let columns = split_columns(content);
    let (name, currency, balance) = match classify_line(&columns, &src)? {
        LineKind::Account(name) => (name, String::new(), None),
        LineKind::AccountWithAmount(name, amount, currency) => {
            let scale = BigRational::from_integer(BigInt::from(MINOR_UNIT_SCALE));
            (name, currency, Some(amount * scale))
        }
    };
    trace!("{}: {} {:?} {}", src, name, balance, currency);
    Ok(AccountChange {
        name,
        description: comment.to_string(),
        currency,
        balance,
        src,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(file: &str, text: &str) -> Vec<Record> {
        let mut records = vec![Record::Marker(Source::new(Arc::new(file.to_string()), 1))];
        records.extend(text.lines().map(|line| Record::Line(line.to_string())));
        records
    }

    fn parse(text: &str) -> Vec<Result<ParsedTransaction, Error>> {
        Parser::new(records("test.ledger", text)).collect()
    }

    fn parse_all(input: Vec<Record>) -> Vec<ParsedTransaction> {
        Parser::new(input).map(Result::unwrap).collect()
    }

    fn hundredths(n: i64) -> Option<BigRational> {
        Some(BigRational::from_integer(BigInt::from(n)))
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(strip_comment("Assets  10 ; cash"), ("Assets  10 ".to_string(), "cash"));
        assert_eq!(strip_comment("; whole line"), (String::new(), "whole line"));
        assert_eq!(strip_comment(r"Food \; Drinks  5"), ("Food ; Drinks  5".to_string(), ""));
        assert_eq!(strip_comment("no comment"), ("no comment".to_string(), ""));
    }

    #[test]
    fn columns() {
        assert_eq!(
            split_columns("Expenses:Groceries   75.00"),
            vec!["Expenses:Groceries", "75.00"]
        );
        assert_eq!(
            split_columns("Expenses:Whole Foods\t\t-3 USD"),
            vec!["Expenses:Whole Foods", "-3 USD"]
        );
        assert_eq!(split_columns("Assets:Checking"), vec!["Assets:Checking"]);
        assert_eq!(
            split_columns("Liabilities:Card  Visa \t (2*3)  "),
            vec!["Liabilities:Card", "Visa", "(2*3)"]
        );
    }

    #[test]
    fn dates() {
        let expected = Date::from_ymd_opt(2011, 3, 15);
        assert_eq!(parse_date("2011/03/15"), expected);
        assert_eq!(parse_date("2011-03-15"), expected);
        assert_eq!(parse_date("2011.03.15"), expected);
        assert_eq!(parse_date("15-Mar-2011"), expected);
        assert_eq!(parse_date("2011-13-15"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn single_transaction() {
        let txns = parse("2011-03-15 Whole Food Market\nExpenses:Groceries   75.00\nAssets:Checking\n\n");
        assert_eq!(txns.len(), 1);
        let txn = txns[0].as_ref().unwrap();
        assert_eq!(txn.payee, "Whole Food Market");
        assert_eq!(txn.date, Date::from_ymd_opt(2011, 3, 15).unwrap());
        assert_eq!(txn.src.line, 1);
        let changes = &txn.account_changes;
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].name, "Expenses:Groceries");
        assert_eq!(changes[0].balance, hundredths(7500));
        assert_eq!(changes[0].src.line, 2);
        assert_eq!(changes[1].name, "Assets:Checking");
        assert_eq!(changes[1].balance, hundredths(-7500));
        assert_eq!(changes[1].src.line, 3);
    }

    #[test]
    fn end_of_input_closes_transaction() {
        let txns = parse("2011/03/15 Rent\nExpenses:Rent  (400*2)\nAssets:Bank  -800");
        assert_eq!(txns.len(), 1);
        let txn = txns[0].as_ref().unwrap();
        assert_eq!(txn.account_changes[0].balance, hundredths(80000));
    }

    #[test]
    fn blank_lines_separate_transactions() {
        let text = "\n\n2011-01-01 A\nX  1\nY\n\n\n; comment\n2011-01-02 B ; note\nX  2\nY  -2\n";
        let txns: Vec<_> = parse(text).into_iter().map(Result::unwrap).collect();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].payee, "A");
        assert_eq!(txns[1].payee, "B");
        assert_eq!(txns[1].src.line, 9);
    }

    #[test]
    fn line_comment_becomes_description() {
        let txns = parse("2011-01-01 Lunch\nExpenses:Food  12.50 ; with Bob\nAssets:Cash\n");
        let txn = txns[0].as_ref().unwrap();
        assert_eq!(txn.account_changes[0].description, "with Bob");
        assert_eq!(txn.account_changes[1].description, "");
    }

    #[test]
    fn header_errors() {
        let txns = parse("2011-01-01\nX  1\nY\n");
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].as_ref().unwrap_err().r#type, ErrorType::HeaderParse);

        let txns = parse("someday Lunch\nX  1\nY\n");
        let err = txns[0].as_ref().unwrap_err();
        assert_eq!(err.r#type, ErrorType::DateParse);
        assert_eq!(err.src.line, 1);
    }

    #[test]
    fn stops_after_first_error() {
        let text = "2011-01-01 A\nX  1\nY\n\nbad header\n\n2011-01-02 B\nX  2\nY\n";
        let txns = parse(text);
        assert_eq!(txns.len(), 2);
        assert!(txns[0].is_ok());
        let err = txns[1].as_ref().unwrap_err();
        assert_eq!(err.r#type, ErrorType::DateParse);
        assert_eq!(err.src.line, 5);
    }

    #[test]
    fn parenthesized_account_takes_the_balance() {
        let txns = parse("2011-01-01 A\nExpenses:Food  10\n(Assets:Budget)\n");
        let txn = txns[0].as_ref().unwrap();
        assert_eq!(txn.account_changes[1].name, "(Assets:Budget)");
        assert_eq!(txn.account_changes[1].balance, hundredths(-1000));
    }

    #[test]
    fn two_blank_balances_are_ambiguous() {
        let txns = parse("2011-01-01 A\nX  1\nY\nZ\n");
        assert_eq!(txns[0].as_ref().unwrap_err().r#type, ErrorType::AmbiguousBalance);
    }

    #[test]
    fn amount_without_account() {
        let txns = parse("2011-01-01 A\n  75.00\nY\n");
        let err = txns[0].as_ref().unwrap_err();
        assert_eq!(err.r#type, ErrorType::AmountParse);
        assert_eq!(err.src.line, 2);
    }

    #[test]
    fn markers_set_position() {
        let mut input = records("a.ledger", "2011-01-01 A\nX  1\nY");
        input.push(Record::Marker(Source::new(Arc::new("b.ledger".to_string()), 7)));
        input.push(Record::Line("2011-01-02 B".to_string()));
        input.push(Record::Line("Z  (1+)".to_string()));
        let txns: Vec<_> = Parser::new(input).collect();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].as_ref().unwrap().account_changes.len(), 2);
        let err = txns[1].as_ref().unwrap_err();
        assert_eq!(err.r#type, ErrorType::AmountParse);
        assert_eq!(err.src.to_string(), "b.ledger:8");
    }

    #[test]
    fn file_boundary_closes_transaction() {
        let mut input = records("a.ledger", "2011-01-01 A\nX  1\nY");
        input.extend(records("b.ledger", "2011-01-02 B\nX  2\nY"));
        let txns: Vec<_> = parse_all(input);
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[1].payee, "B");
        assert_eq!(txns[1].src.to_string(), "b.ledger:1");
    }

    #[test]
    fn classify() {
        let src = Source::new(Arc::new("t".to_string()), 1);
        assert_eq!(
            classify_line(&["Assets", "Checking"], &src).unwrap(),
            LineKind::Account("Assets Checking".to_string())
        );
        assert_eq!(
            classify_line(&["(Assets:Budget)"], &src).unwrap(),
            LineKind::Account("(Assets:Budget)".to_string())
        );
        assert_eq!(
            classify_line(&["Assets", "-1 USD"], &src).unwrap(),
            LineKind::AccountWithAmount(
                "Assets".to_string(),
                BigRational::from_integer(BigInt::from(-1)),
                "USD".to_string()
            )
        );
    }
}
