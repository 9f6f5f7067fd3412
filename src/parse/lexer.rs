use super::Token;
use crate::{Error, ErrorType, Source};
use logos::{Lexer as LogosLexer, Logos};

/// A peekable token stream over one amount field. Whitespace is skipped;
/// errors are attributed to the line the field came from.
pub struct Lexer<'source> {
    llex: LogosLexer<'source, Token>,
    col: usize,
    peeked_token: Option<(Token, &'source str)>,
    src: Source,
}

impl<'source> Lexer<'source> {
    pub fn new(text: &'source str, src: Source) -> Self {
        let mut lexer = Lexer {
            llex: Token::lexer(text),
            col: 1,
            peeked_token: None,
            src,
        };
        lexer.skip_space();
        lexer
    }

    /// Column (1-based, in characters) of the peeked token.
    pub fn col(&self) -> usize {
        self.col
    }

    pub fn src(&self) -> &Source {
        &self.src
    }

    fn skip_space(&mut self) {
        while let Some(token) = self.llex.next() {
            match token {
                Token::WhiteSpace => self.col += self.llex.slice().chars().count(),
                _ => {
                    self.peeked_token = Some((token, self.llex.slice()));
                    return;
                }
            }
        }
    }

    pub fn error(&self, msg: String) -> Error {
        Error {
            msg,
            src: self.src.clone(),
            r#type: ErrorType::AmountParse,
        }
    }

    pub fn peek(&self) -> Result<(Token, &'source str), Error> {
        self.peeked_token
            .ok_or_else(|| self.error("Unexpected end of amount.".to_string()))
    }

    #[inline]
    pub fn consume(&mut self) {
        if let Some((_, text)) = self.peeked_token.take() {
            self.col += text.chars().count();
            self.skip_space();
        }
    }

    pub fn take(&mut self, expected: Token) -> Result<&'source str, Error> {
        let (token, text) = self.peek()?;
        if token != expected {
            Err(self.unexpected(token, text))
        } else {
            self.consume();
            Ok(text)
        }
    }

    pub fn unexpected(&self, token: Token, text: &str) -> Error {
        self.error(format!(
            "Unexpected {:?}({:?}) at column {} of amount.",
            token, text, self.col
        ))
    }
}
