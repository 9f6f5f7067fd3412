//! Amount fields: plain decimals (`-75.00`), parenthesized arithmetic
//! (`(75*2)`), optionally with a currency code (`75.00 USD`, `USD (3*25)`).

use super::{Lexer, Token};
use crate::{utils::parse_decimal, Error, Source};
use log::trace;
use logos::Logos;
use num_rational::BigRational;
use num_traits::Zero;

/// Longest accepted currency code.
const MAX_CODE_LEN: usize = 10;

/// Parses `field` as an amount in units of its currency.
///
/// Returns `Ok(None)` if `field` does not look like an amount at all, so the
/// caller can treat it as part of an account name. A field that looks like an
/// expression but cannot be evaluated is an error.
pub fn parse_amount(field: &str, src: &Source) -> Result<Option<(BigRational, String)>, Error> {
    let (number, currency) = split_currency(field);
    if is_expression(number) {
        let value = eval(number, src)?;
        trace!("{}: {} = {}", src, number, value);
        Ok(Some((value, currency.to_string())))
    } else if is_plain_number(number) {
        parse_decimal(number, src).map(|value| Some((value, currency.to_string())))
    } else {
        Ok(None)
    }
}

fn is_currency_code(text: &str) -> bool {
    !text.is_empty() && text.len() <= MAX_CODE_LEN && text.chars().all(|c| c.is_ascii_uppercase())
}

fn split_currency(field: &str) -> (&str, &str) {
    if let Some((left, right)) = field.rsplit_once(' ') {
        if is_currency_code(right) {
            return (left.trim_end(), right);
        }
    }
    if let Some((left, right)) = field.split_once(' ') {
        if is_currency_code(left) {
            return (right.trim_start(), left);
        }
    }
    (field, "")
}

/// A parenthesized field is an expression unless it contains a word, as in
/// `(Assets:Budget)`, which is an account name.
fn is_expression(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text).trim_start();
    if !body.starts_with('(') || !text.ends_with(')') {
        return false;
    }
    let mut tokens = Token::lexer(body);
    while let Some(token) = tokens.next() {
        if token == Token::Error && tokens.slice().chars().any(|c| c.is_alphabetic() || c == ':' || c == '_') {
            return false;
        }
    }
    true
}

fn is_plain_number(text: &str) -> bool {
    let mut tokens = Token::lexer(text);
    let number = match tokens.next() {
        Some(Token::Minus) | Some(Token::Plus) => tokens.next(),
        token => token,
    };
    number == Some(Token::Number) && tokens.next().is_none()
}

/// Evaluates an arithmetic expression with `+`, `-`, `*`, `/`, unary signs and
/// parentheses, exactly.
pub fn eval(text: &str, src: &Source) -> Result<BigRational, Error> {
    let mut lexer = Lexer::new(text, src.clone());
    let value = parse_sum(&mut lexer)?;
    if let Ok((token, text)) = lexer.peek() {
        return Err(lexer.unexpected(token, text));
    }
    Ok(value)
}

fn parse_sum(lexer: &mut Lexer) -> Result<BigRational, Error> {
    let mut value = parse_product(lexer)?;
    while let Ok((token, _)) = lexer.peek() {
        match token {
            Token::Plus => {
                lexer.consume();
                value += parse_product(lexer)?;
            }
            Token::Minus => {
                lexer.consume();
                value -= parse_product(lexer)?;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn parse_product(lexer: &mut Lexer) -> Result<BigRational, Error> {
    let mut value = parse_factor(lexer)?;
    while let Ok((token, _)) = lexer.peek() {
        match token {
            Token::Asterisk => {
                lexer.consume();
                value *= parse_factor(lexer)?;
            }
            Token::Slash => {
                let col = lexer.col();
                lexer.consume();
                let divisor = parse_factor(lexer)?;
                if divisor.is_zero() {
                    return Err(lexer.error(format!("Division by zero at column {} of amount.", col)));
                }
                value /= divisor;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn parse_factor(lexer: &mut Lexer) -> Result<BigRational, Error> {
    let (token, text) = lexer.peek()?;
    match token {
        Token::Minus => {
            lexer.consume();
            Ok(-parse_factor(lexer)?)
        }
        Token::Plus => {
            lexer.consume();
            parse_factor(lexer)
        }
        Token::Number => {
            lexer.consume();
            parse_decimal(text, lexer.src())
        }
        Token::LParen => {
            lexer.consume();
            let value = parse_sum(lexer)?;
            lexer.take(Token::RParen)?;
            Ok(value)
        }
        _ => Err(lexer.unexpected(token, text)),
    }
}
