//! Expression parser.
//!
//! One layer per precedence level, tight to loose: unary sign, `* /`,
//! `+ -`, comparison (including LIKE / IS NULL / IN / BETWEEN), NOT,
//! AND, OR. Parentheses group but produce no AST node.

use crate::ast::{AggFunc, BinaryOp, ColumnRef, Expr, Literal, UnaryOp};
use crate::error::Result;
use crate::lexer::{Keyword, TokenKind};

use super::Parser;

impl<'a> Parser<'a> {
    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.consume_keyword(Keyword::Or)?.is_some() {
            let right = self.parse_and()?;
            left = Expr::BinaryOp {
                op: BinaryOp::Or,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.consume_keyword(Keyword::And)?.is_some() {
            let right = self.parse_not()?;
            left = Expr::BinaryOp {
                op: BinaryOp::And,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.consume_keyword(Keyword::Not)?.is_some() {
            let expr = self.parse_not()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    /// Parse a comparison: `add (op add | IS [NOT] NULL | [NOT] IN (...)
    /// | [NOT] BETWEEN add AND add | [NOT] LIKE add)?`.
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        let op = match &self.peek()?.kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::NotEq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::LtEq),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let right = self.parse_additive()?;
            return Ok(Expr::BinaryOp {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            });
        }

        if self.check_keyword(Keyword::Is)? {
            self.advance()?;
            let negated = self.consume_keyword(Keyword::Not)?.is_some();
            self.expect(&TokenKind::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        if self.check_keyword(Keyword::Like)? {
            self.advance()?;
            return self.parse_like_tail(left, false);
        }

        if self.check_keyword(Keyword::In)? {
            self.advance()?;
            return self.parse_in_tail(left, false);
        }

        if self.check_keyword(Keyword::Between)? {
            self.advance()?;
            return self.parse_between_tail(left, false);
        }

        // NOT LIKE / NOT IN / NOT BETWEEN
        if self.check_keyword(Keyword::Not)? {
            let next = self.peek_nth(1)?;
            if next.is_keyword(Keyword::Like) {
                self.advance()?;
                self.advance()?;
                return self.parse_like_tail(left, true);
            }
            if next.is_keyword(Keyword::In) {
                self.advance()?;
                self.advance()?;
                return self.parse_in_tail(left, true);
            }
            if next.is_keyword(Keyword::Between) {
                self.advance()?;
                self.advance()?;
                return self.parse_between_tail(left, true);
            }
        }

        Ok(left)
    }

    fn parse_like_tail(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        let pattern = self.parse_additive()?;
        Ok(Expr::Like {
            expr: Box::new(left),
            pattern: Box::new(pattern),
            negated,
        })
    }

    fn parse_in_tail(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let list = self.parse_comma_separated(|p| p.parse_expression())?;
        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::InList {
            expr: Box::new(left),
            list,
            negated,
        })
    }

    fn parse_between_tail(&mut self, left: Expr, negated: bool) -> Result<Expr> {
        let low = self.parse_additive()?;
        self.expect_keyword(Keyword::And)?;
        let high = self.parse_additive()?;
        Ok(Expr::Between {
            expr: Box::new(left),
            low: Box::new(low),
            high: Box::new(high),
            negated,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.peek()?.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.peek()?.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match &self.peek()?.kind {
            TokenKind::Minus => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Minus,
                    expr: Box::new(expr),
                })
            }
            TokenKind::Plus => {
                self.advance()?;
                let expr = self.parse_unary()?;
                Ok(Expr::UnaryOp {
                    op: UnaryOp::Plus,
                    expr: Box::new(expr),
                })
            }
            _ => self.parse_atom(),
        }
    }

    /// Parse an atom: literal, column reference, aggregate call, or a
    /// parenthesized expression.
    fn parse_atom(&mut self) -> Result<Expr> {
        let token = self.peek()?;

        match &token.kind {
            TokenKind::Null => {
                self.advance()?;
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Boolean(b) => {
                let b = *b;
                self.advance()?;
                Ok(Expr::Literal(Literal::Boolean(b)))
            }
            TokenKind::Integer(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expr::Literal(Literal::Integer(n)))
            }
            TokenKind::Float(v) => {
                let v = *v;
                self.advance()?;
                Ok(Expr::Literal(Literal::Float(v)))
            }
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Keyword(kw) => {
                let func = match kw {
                    Keyword::Count => Some(AggFunc::Count),
                    Keyword::Sum => Some(AggFunc::Sum),
                    Keyword::Avg => Some(AggFunc::Avg),
                    Keyword::Min => Some(AggFunc::Min),
                    Keyword::Max => Some(AggFunc::Max),
                    _ => None,
                };
                match func {
                    Some(func) => {
                        self.advance()?;
                        self.parse_aggregate(func)
                    }
                    None => Err(super::unexpected(token, "expression")),
                }
            }
            TokenKind::Identifier(_) => self.parse_column_ref(),
            _ => Err(super::unexpected(token, "expression")),
        }
    }

    fn parse_aggregate(&mut self, func: AggFunc) -> Result<Expr> {
        self.expect(&TokenKind::LeftParen)?;

        let arg = if func == AggFunc::Count && self.check(&TokenKind::Star)? {
            self.advance()?;
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect(&TokenKind::RightParen)?;
        Ok(Expr::Aggregate { func, arg })
    }

    fn parse_column_ref(&mut self) -> Result<Expr> {
        let first = self.parse_identifier()?;
        if self.consume(&TokenKind::Dot)?.is_some() {
            let column = self.parse_identifier()?;
            Ok(Expr::Column(ColumnRef {
                table: Some(first),
                column,
            }))
        } else {
            Ok(Expr::Column(ColumnRef {
                table: None,
                column: first,
            }))
        }
    }
}
