//! SQL Parser.
//!
//! A recursive descent parser that converts a stream of tokens into an
//! Abstract Syntax Tree (AST). One call parses exactly one statement;
//! anything left over besides semicolons is a syntax error.

mod expr;
mod stmt;

use crate::ast::Statement;
use crate::error::{Error, Result};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

/// SQL Parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
        }
    }

    /// Parse a single statement, allowing surrounding semicolons.
    pub fn parse(&mut self) -> Result<Statement> {
        while self.consume(&TokenKind::Semicolon)?.is_some() {}

        let token = self.peek()?;
        if token.is_eof() {
            return Err(Error::syntax(
                "empty statement",
                token.line,
                token.column,
            ));
        }

        let stmt = self.parse_statement()?;

        while self.consume(&TokenKind::Semicolon)?.is_some() {}
        let trailing = self.peek()?;
        if !trailing.is_eof() {
            return Err(Error::syntax(
                format!("unexpected {} after statement", trailing.kind),
                trailing.line,
                trailing.column,
            ));
        }

        Ok(stmt)
    }

    /// Parse a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        let token = self.peek()?;

        match &token.kind {
            TokenKind::Keyword(kw) => match kw {
                Keyword::Select => self.parse_select(),
                Keyword::Insert => self.parse_insert(),
                Keyword::Update => self.parse_update(),
                Keyword::Delete => self.parse_delete(),
                Keyword::Create => self.parse_create(),
                Keyword::Drop => self.parse_drop(),
                Keyword::Show => self.parse_show(),
                Keyword::Describe => self.parse_describe(),
                Keyword::Truncate => self.parse_truncate(),
                _ => Err(unexpected(token, "statement")),
            },
            _ => Err(unexpected(token, "statement")),
        }
    }

    // ========================================================================
    // Parser utilities
    // ========================================================================

    /// Peek at the next token.
    pub(crate) fn peek(&mut self) -> Result<&Token> {
        self.lexer.peek()
    }

    /// Peek at the nth token ahead.
    pub(crate) fn peek_nth(&mut self, n: usize) -> Result<&Token> {
        self.lexer.peek_nth(n)
    }

    /// Advance to the next token and return it.
    pub(crate) fn advance(&mut self) -> Result<Token> {
        self.lexer.next_token_result()
    }

    /// Check if the next token matches the expected kind.
    pub(crate) fn check(&mut self, expected: &TokenKind) -> Result<bool> {
        Ok(&self.peek()?.kind == expected)
    }

    /// Check if the next token is a specific keyword.
    pub(crate) fn check_keyword(&mut self, keyword: Keyword) -> Result<bool> {
        Ok(self.peek()?.is_keyword(keyword))
    }

    /// Consume the next token if it matches.
    pub(crate) fn consume(&mut self, expected: &TokenKind) -> Result<Option<Token>> {
        self.lexer.consume(expected)
    }

    /// Consume a keyword if it matches.
    pub(crate) fn consume_keyword(&mut self, keyword: Keyword) -> Result<Option<Token>> {
        self.lexer.consume_keyword(keyword)
    }

    /// Expect and consume a specific token.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Result<Token> {
        self.lexer.expect(expected)
    }

    /// Expect and consume a specific keyword.
    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token> {
        self.lexer.expect_keyword(keyword)
    }

    /// Parse an identifier.
    pub(crate) fn parse_identifier(&mut self) -> Result<String> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => Err(Error::syntax(
                format!("expected identifier, found {}", token.kind),
                token.line,
                token.column,
            )),
        }
    }

    /// Parse a comma-separated list.
    pub(crate) fn parse_comma_separated<T, F>(&mut self, mut parse_fn: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let mut items = vec![parse_fn(self)?];

        while self.consume(&TokenKind::Comma)?.is_some() {
            items.push(parse_fn(self)?);
        }

        Ok(items)
    }
}

/// Build a syntax error describing an unexpected token.
pub(crate) fn unexpected(token: &Token, expected: &str) -> Error {
    Error::syntax(
        format!("expected {}, found {}", expected, token.kind),
        token.line,
        token.column,
    )
}
