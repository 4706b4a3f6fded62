use crate::frontend::token::Token;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            col: self.col,
        }
    }

    fn error(&self, message: impl Into<String>, line: usize, col: usize) -> LexerError {
        LexerError {
            message: message.into(),
            line,
            col,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_comment(&mut self) -> Token {
        // consume "//"
        self.advance();
        self.advance();
        let mut comment = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            comment.push(ch);
            self.advance();
        }
        Token::Comment(comment.trim().to_string())
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(string));
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => string.push('\n'),
                        Some('t') => string.push('\t'),
                        Some('r') => string.push('\r'),
                        Some('\\') => string.push('\\'),
                        Some('"') => string.push('"'),
                        Some('0') => string.push('\0'),
                        Some(ch) => {
                            return Err(self.error(
                                format!("unknown escape sequence: \\{}", ch),
                                self.line,
                                self.col,
                            ));
                        }
                        None => {
                            return Err(self.error(
                                "unexpected EOF in escape sequence",
                                self.line,
                                self.col,
                            ));
                        }
                    }
                    self.advance();
                }
                Some('\n') => {
                    return Err(self.error(
                        "unterminated string (newline before closing quote)",
                        start_line,
                        start_col,
                    ));
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error("unterminated string literal", start_line, start_col));
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, LexerError> {
        let start_line = self.line;
        let start_col = self.col;

        let is_negative = self.current() == Some('-');
        if is_negative {
            self.advance();
        }

        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(self.error("expected digits", start_line, start_col));
        }

        // An identifier glued to a number ("12abc") is not a valid token.
        if let Some(ch) = self.current() {
            if ch.is_alphabetic() || ch == '_' {
                return Err(self.error(
                    format!("invalid integer literal: {}{}", digits, ch),
                    start_line,
                    start_col,
                ));
            }
        }

        if is_negative {
            digits.insert(0, '-');
        }

        let value: i64 = digits.parse().map_err(|_| {
            self.error(format!("invalid integer: {}", digits), start_line, start_col)
        })?;

        Ok(Token::Integer(value))
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "if" => Token::If,
            "else" => Token::Else,
            "print" => Token::Print,
            "input" => Token::Input,
            _ => Token::Ident(ident),
        }
    }

    fn read_operator(&mut self) -> Option<Token> {
        let ch = self.current()?;
        let next = self.peek();

        let token = match (ch, next) {
            ('=', Some('=')) => {
                self.advance();
                self.advance();
                Token::Equal
            }
            ('=', _) => {
                self.advance();
                Token::Assign
            }
            ('+', _) => {
                self.advance();
                Token::Plus
            }
            (';', _) => {
                self.advance();
                Token::Semicolon
            }
            ('(', _) => {
                self.advance();
                Token::LParen
            }
            (')', _) => {
                self.advance();
                Token::RParen
            }
            ('{', _) => {
                self.advance();
                Token::LBrace
            }
            ('}', _) => {
                self.advance();
                Token::RBrace
            }
            _ => return None,
        };

        Some(token)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let span = self.span();

            match self.current() {
                None => {
                    tokens.push(Spanned {
                        token: Token::Eof,
                        span,
                    });
                    break;
                }
                Some('\n') => {
                    tokens.push(Spanned {
                        token: Token::Newline,
                        span,
                    });
                    self.advance();
                }
                Some('/') if self.peek() == Some('/') => {
                    let token = self.read_comment();
                    tokens.push(Spanned { token, span });
                }
                Some('"') => {
                    let token = self.read_string()?;
                    tokens.push(Spanned { token, span });
                }
                Some('-') if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) => {
                    let token = self.read_number()?;
                    tokens.push(Spanned { token, span });
                }
                Some(ch) if ch.is_ascii_digit() => {
                    let token = self.read_number()?;
                    tokens.push(Spanned { token, span });
                }
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    let token = self.read_identifier();
                    tokens.push(Spanned { token, span });
                }
                Some(ch) => match self.read_operator() {
                    Some(token) => tokens.push(Spanned { token, span }),
                    None => {
                        return Err(self.error(
                            format!("unexpected character: '{}'", ch),
                            self.line,
                            self.col,
                        ));
                    }
                },
            }
        }

        Ok(tokens)
    }

    pub fn tokenize_clean(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let tokens = self.tokenize()?;
        Ok(tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Comment(_) | Token::Newline))
            .collect())
    }
}
