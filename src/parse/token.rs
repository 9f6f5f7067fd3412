use logos::Logos;

/// Tokens of an amount field, e.g. `-75.00` or `(75*2 + 0.5)`.
#[derive(Debug, PartialEq, Logos, Clone, Copy)]
pub enum Token {
    #[regex(r"[ \t]+")]
    WhiteSpace,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Asterisk,

    #[token("/")]
    Slash,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r"\d+(\.\d+)?")]
    Number,

    #[error]
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_expression() {
        let tokens: Vec<_> = Token::lexer("(75*2) - 1.5").collect();
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::Number,
                Token::Asterisk,
                Token::Number,
                Token::RParen,
                Token::WhiteSpace,
                Token::Minus,
                Token::WhiteSpace,
                Token::Number,
            ]
        );
    }

    #[test]
    fn unsupported_operator() {
        let tokens: Vec<_> = Token::lexer("2^3").collect();
        assert_eq!(tokens, vec![Token::Number, Token::Error, Token::Number]);
    }
}
