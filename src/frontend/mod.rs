pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;
pub mod token_dumper;

pub use lexer::{Lexer, LexerError, Span, Spanned};
pub use parser::{Parsed, Parser};
pub use parser_error::ParserError;
pub use token::Token;
