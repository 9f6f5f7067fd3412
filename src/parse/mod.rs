mod amount;
mod checker;
mod include;
mod lexer;
mod parser;
mod token;

pub use amount::{eval, parse_amount};
pub use checker::resolve;
pub use include::{Includer, Record};
pub use lexer::Lexer;
pub use parser::*;
pub use token::Token;
