use crate::frontend::lexer::Spanned;
use crate::frontend::token::Token;

pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints a nicer value for some tokens
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, tokens: &[Spanned]) {
        print!("{}", self.render(tokens));
    }

    pub fn render(&self, tokens: &[Spanned]) -> String {
        tokens.iter().map(|s| self.render_one(s)).collect()
    }

    fn render_one(&self, s: &Spanned) -> String {
        let line = s.span.line;
        let col = s.span.col;

        let kind = self.kind(&s.token);
        let colr = if self.color { self.color(&s.token) } else { "" };
        let reset = if self.color { Self::RESET } else { "" };

        let text = if self.show_debug_repr {
            format!("{:?}", s.token)
        } else {
            match &s.token {
                Token::Comment(c) => format!("//{}", c),
                Token::Newline => "NEWLINE".to_string(),
                other => other.describe(),
            }
        };

        format!(
            "[{:02}:{:02}] {}{:<8} {}{}\n",
            line, col, colr, kind, text, reset
        )
    }

    fn kind(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Newline => "NEWLINE",
            Comment(_) => "COMMENT",
            Eof => "EOF",

            Integer(_) => "INT",
            String(_) => "STRING",

            Ident(_) => "IDENT",

            LParen | RParen => "PAREN",
            LBrace | RBrace => "BRACE",
            Semicolon => "SEMI",

            Plus | Assign => "OP",
            Equal => "CMP",

            If | Else | Print | Input => "KEYWORD",
        }
    }

    fn color(&self, t: &Token) -> &'static str {
        use Token::*;
        match t {
            Newline | Comment(_) | Eof => Self::DIM,
            String(_) => Self::GRN,
            Integer(_) => Self::CYN,
            Ident(_) => Self::YEL,
            Plus | Assign | Equal => Self::MAG,
            _ => Self::RESET,
        }
    }
}
