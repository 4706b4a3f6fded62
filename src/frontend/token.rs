#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Integer(i64),
    String(std::string::String),

    // Keywords
    If,
    Else,
    Print,
    Input,

    // Operators
    Assign, // =
    Equal,  // ==
    Plus,   // +

    // Delimiters
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }

    // Identifier (variable name)
    Ident(std::string::String),

    // Special
    Comment(std::string::String),
    Newline,
    Eof,
}

impl Token {
    /// Returns true if this token is a reserved word
    pub fn is_keyword(&self) -> bool {
        matches!(self, Token::If | Token::Else | Token::Print | Token::Input)
    }

    /// Short human-readable spelling, used in parser messages.
    pub fn describe(&self) -> std::string::String {
        match self {
            Token::Integer(n) => format!("integer {}", n),
            Token::String(s) => format!("string \"{}\"", s),
            Token::If => "'if'".to_string(),
            Token::Else => "'else'".to_string(),
            Token::Print => "'print'".to_string(),
            Token::Input => "'input'".to_string(),
            Token::Assign => "'='".to_string(),
            Token::Equal => "'=='".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Comment(_) => "comment".to_string(),
            Token::Newline => "newline".to_string(),
            Token::Eof => "end of file".to_string(),
        }
    }
}
