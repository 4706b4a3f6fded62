use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::token::Token;
use crate::lang::{
    Diagnostics, DiagnosticKind, NodeId, Symbol, SymbolId, SymbolTable, SyntaxTree,
};

/// Everything the front end hands to the core.
#[derive(Debug)]
pub struct Parsed {
    pub symbols: SymbolTable,
    pub tree: SyntaxTree,
    pub root: NodeId,
    pub diagnostics: Diagnostics,
}

/// Recursive-descent parser for my_c.
///
/// The parser consumes lexed `Spanned` tokens and builds the syntax tree
/// through the [`SyntaxTree`] constructors, so semantic checks run as each
/// node is made. Symbols are interned in first-seen order.
///
/// Notes:
/// - Expects tokens from `Lexer::tokenize_clean` (no comments or newlines).
/// - A syntax error never stops the parse: it is recorded as a diagnostic,
///   the statement becomes an `error` statement and parsing resumes after
///   the next `;` (or before the next `}`).
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Span of the most recently consumed token.
    last_span: Option<Span>,

    symbols: SymbolTable,
    tree: SyntaxTree,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last_span: None,
            symbols: SymbolTable::new(),
            tree: SyntaxTree::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Returns the current token without consuming it.
    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    /// Advances the token stream by one and returns the consumed token.
    ///
    /// Nodes built from here on carry the consumed token's line.
    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if let Some(s) = &token {
            self.last_span = Some(s.span);
            self.tree.set_line(s.span.line);
        }
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|s| &s.token)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Eof))
    }

    fn line(&self) -> usize {
        self.current()
            .map(|s| s.span.line)
            .or(self.last_span.map(|s| s.line))
            .unwrap_or(1)
    }

    /// Constructs a `ParserError` at the most relevant location.
    fn error(&self, message: &str) -> ParserError {
        let span = self
            .current()
            .map(|s| s.span)
            .or(self.last_span)
            .unwrap_or(Span { line: 1, col: 1 });
        ParserError {
            message: message.to_string(),
            line: span.line,
            col: span.col,
        }
    }

    fn unexpected(&self, expected: &str) -> ParserError {
        let found = self
            .peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of file".to_string());
        self.error(&format!("expected {}, found {}", expected, found))
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ParserError> {
        if self.peek() == Some(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Parses a complete program.
    pub fn parse(mut self) -> Parsed {
        let mut statements = Vec::new();

        while !self.at_end() {
            if self.peek() == Some(&Token::RBrace) {
                let err = self.unexpected("a statement");
                self.advance();
                statements.push(self.report(err));
                continue;
            }
            statements.push(self.statement());
        }

        let root = self.sequence(statements);
        log::debug!(
            "parsed {} nodes, {} symbols, {} diagnostics",
            self.tree.len(),
            self.symbols.len(),
            self.diagnostics.count()
        );

        Parsed {
            symbols: self.symbols,
            tree: self.tree,
            root,
            diagnostics: self.diagnostics,
        }
    }

    /// Folds statements into left-nested sequence nodes.
    fn sequence(&mut self, statements: Vec<NodeId>) -> NodeId {
        let mut iter = statements.into_iter();
        match iter.next() {
            None => self.tree.empty_statement(),
            Some(first) => iter.fold(first, |acc, next| self.tree.statement_list(acc, next)),
        }
    }

    // ── statements ──────────────────────────────────────────────────────

    /// Parses one statement, recovering from syntax errors.
    fn statement(&mut self) -> NodeId {
        match self.try_statement() {
            Ok(node) => node,
            Err(err) => {
                self.recover();
                self.report(err)
            }
        }
    }

    fn report(&mut self, err: ParserError) -> NodeId {
        self.diagnostics
            .error(err.line, DiagnosticKind::Syntax(err.message));
        self.tree.error_statement()
    }

    /// Skips to just after the next `;`, or to the next `}` or end of input.
    fn recover(&mut self) {
        while let Some(token) = self.peek() {
            match token {
                Token::Eof | Token::RBrace => return,
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn try_statement(&mut self) -> Result<NodeId, ParserError> {
        match self.peek() {
            Some(Token::Semicolon) => {
                self.advance();
                Ok(self.tree.empty_statement())
            }

            Some(Token::Print) => {
                self.advance();
                let expr = self.expression()?;
                self.expect(Token::Semicolon, "';' after print")?;
                Ok(self.tree.print_statement(expr))
            }

            Some(Token::Input) => {
                self.advance();
                let var = match self.peek() {
                    Some(Token::Ident(name)) => {
                        let name = name.clone();
                        self.advance();
                        self.identifier_symbol(&name)?
                    }
                    _ => return Err(self.unexpected("an identifier after 'input'")),
                };
                self.expect(Token::Semicolon, "';' after input")?;
                Ok(self.tree.input_statement(var))
            }

            Some(Token::If) => self.if_statement(),

            Some(Token::LBrace) => {
                self.advance();
                let mut statements = Vec::new();
                while !self.at_end() && self.peek() != Some(&Token::RBrace) {
                    statements.push(self.statement());
                }
                self.expect(Token::RBrace, "'}' to close the block")?;
                Ok(self.sequence(statements))
            }

            Some(Token::Else) => Err(self.error("'else' without a matching 'if'")),

            _ => {
                let expr = self.expression()?;
                self.expect(Token::Semicolon, "';' after expression")?;
                Ok(self.tree.expression_statement(expr))
            }
        }
    }

    fn if_statement(&mut self) -> Result<NodeId, ParserError> {
        // condition errors are reported on the line of the 'if'
        let line = self.line();
        self.advance(); // consume 'if'
        self.expect(Token::LParen, "'(' after 'if'")?;
        let cond = self.expression()?;
        self.expect(Token::RParen, "')' after the condition")?;

        let then = self.statement();

        if self.peek() == Some(&Token::Else) {
            self.advance();
            let otherwise = self.statement();
            self.tree.set_line(line);
            Ok(self
                .tree
                .if_then_else(cond, then, otherwise, &mut self.diagnostics))
        } else {
            self.tree.set_line(line);
            Ok(self.tree.if_then(cond, then, &mut self.diagnostics))
        }
    }

    // ── expressions ─────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<NodeId, ParserError> {
        if let (Some(Token::Ident(name)), Some(Token::Assign)) = (self.peek(), self.peek_next()) {
            let name = name.clone();
            self.advance(); // identifier
            self.advance(); // '='
            let var = self.identifier_symbol(&name)?;
            let value = self.expression()?;
            return Ok(self.tree.assign(var, value));
        }
        self.equality()
    }

    fn equality(&mut self) -> Result<NodeId, ParserError> {
        let mut left = self.additive()?;
        while self.peek() == Some(&Token::Equal) {
            self.advance();
            let right = self.additive()?;
            left = self.tree.equals(left, right, &mut self.diagnostics);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<NodeId, ParserError> {
        let mut left = self.primary()?;
        while self.peek() == Some(&Token::Plus) {
            self.advance();
            let right = self.primary()?;
            left = self.tree.add(left, right, &mut self.diagnostics);
        }
        Ok(left)
    }

    fn primary(&mut self) -> Result<NodeId, ParserError> {
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(self.unexpected("an expression")),
        };

        match token {
            Token::Ident(name) => {
                self.advance();
                let symbol = self.identifier_symbol(&name)?;
                Ok(self.tree.identifier(symbol))
            }
            Token::String(text) => {
                self.advance();
                let name = format!("{:?}", text);
                let line = self.line();
                let symbol = self.intern(Symbol::string_constant(name, text, line))?;
                Ok(self.tree.string_constant(symbol))
            }
            Token::Integer(value) => {
                self.advance();
                let line = self.line();
                let symbol =
                    self.intern(Symbol::integer_constant(value.to_string(), value, line))?;
                Ok(self.tree.integer_constant(symbol))
            }
            Token::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    // ── symbols ─────────────────────────────────────────────────────────

    fn identifier_symbol(&mut self, name: &str) -> Result<SymbolId, ParserError> {
        let line = self.line();
        self.intern(Symbol::identifier(name, line))
    }

    /// Adds `symbol` unless a symbol of that name exists; either way returns
    /// the id of the stored one.
    fn intern(&mut self, symbol: Symbol) -> Result<SymbolId, ParserError> {
        let name = symbol.name.clone();
        self.symbols.add(symbol);
        self.symbols
            .lookup(&name)
            .ok_or_else(|| self.error(&format!("symbol '{}' could not be stored", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::lang::{DataType, NodeKind, SymbolKind};

    fn parse(source: &str) -> Parsed {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize_clean().unwrap();
        Parser::new(tokens).parse()
    }

    fn parse_ok(source: &str) -> Parsed {
        let parsed = parse(source);
        let errors: Vec<_> = parsed.diagnostics.iter().map(|d| d.to_string()).collect();
        assert!(errors.is_empty(), "unexpected diagnostics: {:?}", errors);
        parsed
    }

    fn kind(parsed: &Parsed, id: NodeId) -> NodeKind {
        parsed.tree[id].kind
    }

    fn child(parsed: &Parsed, id: NodeId, i: usize) -> NodeId {
        parsed.tree[id].children[i]
    }

    #[test]
    fn test_print_statement() {
        let p = parse_ok("print 1 + 2;");
        assert_eq!(kind(&p, p.root), NodeKind::PrintStatement);
        let add = child(&p, p.root, 0);
        assert_eq!(kind(&p, add), NodeKind::Add);
        assert_eq!(p.tree[add].ty, DataType::Integer);
    }

    #[test]
    fn test_empty_program() {
        let p = parse_ok("// nothing here\n");
        assert_eq!(kind(&p, p.root), NodeKind::EmptyStatement);
        assert!(p.symbols.is_empty());
    }

    #[test]
    fn test_statement_lists_nest_left() {
        let p = parse_ok("print 1; print 2; print 3;");
        assert_eq!(kind(&p, p.root), NodeKind::StatementList);
        let left = child(&p, p.root, 0);
        assert_eq!(kind(&p, left), NodeKind::StatementList);
        assert_eq!(kind(&p, child(&p, p.root, 1)), NodeKind::PrintStatement);
        assert_eq!(kind(&p, child(&p, left, 0)), NodeKind::PrintStatement);
    }

    #[test]
    fn test_symbols_in_first_seen_order() {
        let p = parse_ok("x = \"hi\"; print x + 5; print \"hi\";");
        let names: Vec<_> = p.symbols.iter().map(|(_, s)| s.name.clone()).collect();
        assert_eq!(names, vec!["x", "\"hi\"", "5"]);
        let kinds: Vec<_> = p.symbols.iter().map(|(_, s)| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SymbolKind::Identifier,
                SymbolKind::StringConstant,
                SymbolKind::IntegerConstant
            ]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let p = parse_ok("a = b = 1;");
        let assign = child(&p, p.root, 0);
        assert_eq!(kind(&p, assign), NodeKind::Assign);
        let inner = child(&p, assign, 0);
        assert_eq!(kind(&p, inner), NodeKind::Assign);
        assert_eq!(p.tree[assign].ty, DataType::Integer);
    }

    #[test]
    fn test_if_else_and_blocks() {
        let p = parse_ok("if (1 == 1) { print 1; print 2; } else print 3;");
        assert_eq!(kind(&p, p.root), NodeKind::IfThenElse);
        assert_eq!(kind(&p, child(&p, p.root, 1)), NodeKind::StatementList);
        assert_eq!(kind(&p, child(&p, p.root, 2)), NodeKind::PrintStatement);
    }

    #[test]
    fn test_coercion_inserted() {
        let p = parse_ok("print \"n=\" + 4;");
        let add = child(&p, p.root, 0);
        assert_eq!(kind(&p, child(&p, add, 1)), NodeKind::CoerceToString);
    }

    #[test]
    fn test_input_statement() {
        let p = parse_ok("input name;");
        assert_eq!(kind(&p, p.root), NodeKind::InputStatement);
        let sym = p.tree[p.root].symbol.unwrap();
        assert_eq!(p.symbols.get(sym).unwrap().name, "name");
    }

    #[test]
    fn test_semantic_error_recorded_with_line() {
        let p = parse("x = 1;\nif (x) print 1;");
        assert_eq!(p.diagnostics.count(), 1);
        let d = p.diagnostics.iter().next().unwrap();
        assert_eq!(d.line, 2);
        assert!(matches!(d.kind, DiagnosticKind::ConditionNotBoolean(_)));
    }

    #[test]
    fn test_equality_mismatch() {
        let p = parse("print 1 == \"1\";");
        assert_eq!(p.diagnostics.count(), 1);
        assert!(p.diagnostics.iter().next().unwrap().to_string().contains("=="));
    }

    #[test]
    fn test_syntax_error_recovers_at_semicolon() {
        let p = parse("print ;\nprint 2;");
        assert_eq!(p.diagnostics.count(), 1);
        let d = p.diagnostics.iter().next().unwrap();
        assert_eq!(d.line, 1);
        assert!(matches!(d.kind, DiagnosticKind::Syntax(_)));

        assert_eq!(kind(&p, p.root), NodeKind::StatementList);
        assert_eq!(kind(&p, child(&p, p.root, 0)), NodeKind::ErrorStatement);
        assert_eq!(kind(&p, child(&p, p.root, 1)), NodeKind::PrintStatement);
    }

    #[test]
    fn test_syntax_error_inside_block() {
        let p = parse("{ print 1 print 2; } print 3;");
        assert_eq!(p.diagnostics.count(), 1);
        assert_eq!(kind(&p, child(&p, p.root, 1)), NodeKind::PrintStatement);
    }

    #[test]
    fn test_stray_closing_brace() {
        let p = parse("} print 1;");
        assert_eq!(p.diagnostics.count(), 1);
        assert!(
            p.diagnostics
                .iter()
                .next()
                .unwrap()
                .to_string()
                .contains("expected a statement, found '}'")
        );
    }

    #[test]
    fn test_missing_semicolon_at_end() {
        let p = parse("print 1");
        assert_eq!(p.diagnostics.count(), 1);
        assert!(
            p.diagnostics
                .iter()
                .next()
                .unwrap()
                .to_string()
                .contains("found end of file")
        );
    }

    #[test]
    fn test_else_without_if() {
        let p = parse("else print 1;");
        assert_eq!(p.diagnostics.count(), 1);
    }
}
