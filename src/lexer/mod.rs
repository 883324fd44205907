//! SQL Lexer/Tokenizer.
//!
//! Tokenizes SQL input into a stream of [`Token`]s carrying 1-based line and
//! column positions. Whitespace delimits tokens; `-- line` and `/* block */`
//! comments are skipped.

mod token;

pub use token::{Keyword, Token, TokenKind};

use crate::error::{Error, Result};

/// SQL Lexer that tokenizes input into a stream of tokens.
pub struct Lexer<'a> {
    /// The input source string.
    input: &'a str,
    /// Current position in the input (byte offset).
    pos: usize,
    /// Current 1-based line.
    line: u32,
    /// Current 1-based column.
    column: u32,
    /// Start position of the current token.
    start: usize,
    start_line: u32,
    start_column: u32,
    /// Peeked tokens (for lookahead).
    peeked: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            start: 0,
            start_line: 1,
            start_column: 1,
            peeked: Vec::new(),
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token> {
        if self.peeked.is_empty() {
            let token = self.next_token()?;
            self.peeked.push(token);
        }
        Ok(&self.peeked[0])
    }

    /// Peek at the nth token ahead (0 = next token).
    pub fn peek_nth(&mut self, n: usize) -> Result<&Token> {
        while self.peeked.len() <= n {
            let token = self.next_token()?;
            self.peeked.push(token);
        }
        Ok(&self.peeked[n])
    }

    /// Get the next token, consuming it.
    pub fn next_token_result(&mut self) -> Result<Token> {
        if !self.peeked.is_empty() {
            return Ok(self.peeked.remove(0));
        }
        self.next_token()
    }

    /// Consume the next token if it matches the expected kind.
    pub fn consume(&mut self, expected: &TokenKind) -> Result<Option<Token>> {
        let token = self.peek()?;
        if &token.kind == expected {
            Ok(Some(self.next_token_result()?))
        } else {
            Ok(None)
        }
    }

    /// Consume the next token if it's the specified keyword.
    pub fn consume_keyword(&mut self, keyword: Keyword) -> Result<Option<Token>> {
        let token = self.peek()?;
        if token.is_keyword(keyword) {
            Ok(Some(self.next_token_result()?))
        } else {
            Ok(None)
        }
    }

    /// Expect and consume a specific token kind.
    pub fn expect(&mut self, expected: &TokenKind) -> Result<Token> {
        let token = self.next_token_result()?;
        if &token.kind == expected {
            Ok(token)
        } else {
            Err(Error::syntax(
                format!("expected {}, found {}", expected, token.kind),
                token.line,
                token.column,
            ))
        }
    }

    /// Expect and consume a specific keyword.
    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token> {
        let token = self.next_token_result()?;
        if token.is_keyword(keyword) {
            Ok(token)
        } else {
            Err(Error::syntax(
                format!("expected {}, found {}", keyword, token.kind),
                token.line,
                token.column,
            ))
        }
    }

    /// Internal: get the next token from input.
    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments()?;

        self.start = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;

        if self.is_at_end() {
            return Ok(self.make_token(TokenKind::Eof));
        }

        let c = self.advance();

        match c {
            '(' => Ok(self.make_token(TokenKind::LeftParen)),
            ')' => Ok(self.make_token(TokenKind::RightParen)),
            ',' => Ok(self.make_token(TokenKind::Comma)),
            ';' => Ok(self.make_token(TokenKind::Semicolon)),
            '.' => Ok(self.make_token(TokenKind::Dot)),
            '+' => Ok(self.make_token(TokenKind::Plus)),
            '-' => Ok(self.make_token(TokenKind::Minus)),
            '*' => Ok(self.make_token(TokenKind::Star)),
            '/' => Ok(self.make_token(TokenKind::Slash)),
            '=' => Ok(self.make_token(TokenKind::Eq)),
            '!' => {
                if self.matches('=') {
                    Ok(self.make_token(TokenKind::NotEq))
                } else {
                    Err(self.error_here("unexpected character '!'"))
                }
            }
            '<' => {
                if self.matches('=') {
                    Ok(self.make_token(TokenKind::LtEq))
                } else if self.matches('>') {
                    Ok(self.make_token(TokenKind::NotEq))
                } else {
                    Ok(self.make_token(TokenKind::Lt))
                }
            }
            '>' => {
                if self.matches('=') {
                    Ok(self.make_token(TokenKind::GtEq))
                } else {
                    Ok(self.make_token(TokenKind::Gt))
                }
            }
            '\'' => self.scan_string(),
            '0'..='9' => {
                self.rewind_to_start();
                self.scan_number()
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                self.rewind_to_start();
                self.scan_identifier_or_keyword()
            }
            _ => Err(self.error_here(format!("unexpected character '{}'", c))),
        }
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            if self.check('-') && self.check_next('-') {
                self.skip_line_comment();
            } else if self.check('/') && self.check_next('*') {
                self.skip_block_comment()?;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip a line comment (`-- ...`).
    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip a block comment (`/* ... */`).
    fn skip_block_comment(&mut self) -> Result<()> {
        let line = self.line;
        let column = self.column;
        self.advance(); // consume '/'
        self.advance(); // consume '*'

        loop {
            if self.is_at_end() {
                return Err(Error::syntax("unterminated block comment", line, column));
            }
            if self.check('*') && self.check_next('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier_or_keyword(&mut self) -> Result<Token> {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[self.start..self.pos];

        if let Some(keyword) = Keyword::parse(text) {
            // TRUE, FALSE, and NULL lex into literal token kinds
            match keyword {
                Keyword::True => Ok(self.make_token(TokenKind::Boolean(true))),
                Keyword::False => Ok(self.make_token(TokenKind::Boolean(false))),
                Keyword::Null => Ok(self.make_token(TokenKind::Null)),
                _ => Ok(self.make_token(TokenKind::Keyword(keyword))),
            }
        } else {
            Ok(self.make_token(TokenKind::Identifier(text.to_string())))
        }
    }

    /// Scan a single-quoted string literal; `''` escapes one quote.
    fn scan_string(&mut self) -> Result<Token> {
        let mut value = String::new();

        loop {
            if self.is_at_end() {
                return Err(Error::syntax(
                    "unterminated string literal",
                    self.start_line,
                    self.start_column,
                ));
            }

            let c = self.advance();

            if c == '\'' {
                if self.check('\'') {
                    self.advance();
                    value.push('\'');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }

        Ok(self.make_token(TokenKind::String(value)))
    }

    /// Scan a number literal (integer or float).
    fn scan_number(&mut self) -> Result<Token> {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let has_decimal = self.check('.') && self.check_next_char(|c| c.is_ascii_digit());
        let has_exponent = self.peek_char().is_some_and(|c| c == 'e' || c == 'E');

        if has_decimal || has_exponent {
            if has_decimal {
                self.advance(); // consume '.'
                while let Some(c) = self.peek_char() {
                    if c.is_ascii_digit() {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }

            if let Some(c) = self.peek_char() {
                if c == 'e' || c == 'E' {
                    self.advance();
                    if let Some(sign) = self.peek_char() {
                        if sign == '+' || sign == '-' {
                            self.advance();
                        }
                    }
                    while let Some(c) = self.peek_char() {
                        if c.is_ascii_digit() {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }

            let text = &self.input[self.start..self.pos];
            match text.parse::<f64>() {
                Ok(value) => Ok(self.make_token(TokenKind::Float(value))),
                Err(_) => Err(self.error_here(format!("invalid number '{}'", text))),
            }
        } else {
            let text = &self.input[self.start..self.pos];
            match text.parse::<i64>() {
                Ok(value) => Ok(self.make_token(TokenKind::Integer(value))),
                Err(_) => Err(self.error_here(format!("invalid number '{}'", text))),
            }
        }
    }

    // Helper methods

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> char {
        let c = self.input[self.pos..].chars().next().unwrap_or('\0');
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Reset the scan position to the token start (used after dispatch
    /// consumed the first character of a number or identifier).
    fn rewind_to_start(&mut self) {
        self.pos = self.start;
        self.line = self.start_line;
        self.column = self.start_column;
    }

    fn check(&self, expected: char) -> bool {
        self.peek_char() == Some(expected)
    }

    fn check_next(&self, expected: char) -> bool {
        self.input[self.pos..].chars().nth(1) == Some(expected)
    }

    fn check_next_char<F: Fn(char) -> bool>(&self, f: F) -> bool {
        self.input[self.pos..].chars().nth(1).is_some_and(f)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            &self.input[self.start..self.pos],
            self.start_line,
            self.start_column,
        )
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        Error::syntax(message, self.start_line, self.start_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            match lexer.next_token_result() {
                Ok(token) => {
                    if token.kind == TokenKind::Eof {
                        break;
                    }
                    tokens.push(token.kind);
                }
                Err(e) => panic!("Lexer error: {}", e),
            }
        }
        tokens
    }

    #[test]
    fn test_simple_select() {
        let tokens = tokenize("SELECT * FROM users");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Star,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Identifier("users".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("123 45.67 1e10 0");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Integer(123),
                TokenKind::Float(45.67),
                TokenKind::Float(1e10),
                TokenKind::Integer(0),
            ]
        );
    }

    #[test]
    fn test_strings_with_escape() {
        let tokens = tokenize("'hello' 'it''s'");
        assert_eq!(
            tokens,
            vec![
                TokenKind::String("hello".to_string()),
                TokenKind::String("it's".to_string()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("+ - * / = != <> < <= > >=");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = tokenize("SELECT -- comment\n* /* block */ FROM");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Star,
                TokenKind::Keyword(Keyword::From),
            ]
        );
    }

    #[test]
    fn test_boolean_and_null() {
        let tokens = tokenize("TRUE FALSE NULL true false null");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Null,
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Null,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("SELECT\n  name");
        let t1 = lexer.next_token_result().unwrap();
        assert_eq!((t1.line, t1.column), (1, 1));
        let t2 = lexer.next_token_result().unwrap();
        assert_eq!((t2.line, t2.column), (2, 3));
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'abc");
        let err = lexer.next_token_result().unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_invalid_character() {
        let mut lexer = Lexer::new("SELECT @");
        lexer.next_token_result().unwrap();
        assert!(lexer.next_token_result().is_err());
    }

    #[test]
    fn test_qualified_name() {
        let tokens = tokenize("a.id");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Dot,
                TokenKind::Identifier("id".to_string()),
            ]
        );
    }
}
