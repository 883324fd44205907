//! Statement parser for DDL, DML, and utility statements.

use crate::ast::{
    Assignment, ColumnDef, CreateIndexStatement, CreateTableStatement, DeleteStatement,
    InsertStatement, Join, JoinType, Literal, OrderByExpr, SelectItem, SelectStatement, Statement,
    TableRef, UpdateStatement,
};
use crate::error::{Error, Result};
use crate::lexer::{Keyword, TokenKind};
use crate::types::DataType;

use super::{unexpected, Parser};

impl<'a> Parser<'a> {
    pub(crate) fn parse_select(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Select)?;

        let distinct = self.consume_keyword(Keyword::Distinct)?.is_some();

        let projection = if self.consume(&TokenKind::Star)?.is_some() {
            vec![SelectItem::Wildcard]
        } else {
            self.parse_comma_separated(|p| p.parse_select_item())?
        };

        self.expect_keyword(Keyword::From)?;
        let from = self.parse_table_ref()?;

        let mut joins = Vec::new();
        while let Some(join_type) = self.parse_join_type()? {
            let table = self.parse_table_ref()?;
            self.expect_keyword(Keyword::On)?;
            let on = self.parse_expression()?;
            joins.push(Join {
                join_type,
                table,
                on,
            });
        }

        let where_clause = if self.consume_keyword(Keyword::Where)?.is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let group_by = if self.consume_keyword(Keyword::Group)?.is_some() {
            self.expect_keyword(Keyword::By)?;
            self.parse_comma_separated(|p| p.parse_expression())?
        } else {
            Vec::new()
        };

        let having = if self.consume_keyword(Keyword::Having)?.is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let order_by = if self.consume_keyword(Keyword::Order)?.is_some() {
            self.expect_keyword(Keyword::By)?;
            self.parse_comma_separated(|p| p.parse_order_by_expr())?
        } else {
            Vec::new()
        };

        let limit = if self.consume_keyword(Keyword::Limit)?.is_some() {
            Some(self.parse_unsigned()?)
        } else {
            None
        };

        let offset = if self.consume_keyword(Keyword::Offset)?.is_some() {
            Some(self.parse_unsigned()?)
        } else {
            None
        };

        Ok(Statement::Select(Box::new(SelectStatement {
            distinct,
            projection,
            from,
            joins,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })))
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        let expr = self.parse_expression()?;
        let alias = if self.consume_keyword(Keyword::As)?.is_some() {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.parse_identifier()?;
        let alias = if self.consume_keyword(Keyword::As)?.is_some() {
            Some(self.parse_identifier()?)
        } else if matches!(self.peek()?.kind, TokenKind::Identifier(_)) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        Ok(TableRef { name, alias })
    }

    fn parse_join_type(&mut self) -> Result<Option<JoinType>> {
        if self.consume_keyword(Keyword::Join)?.is_some() {
            return Ok(Some(JoinType::Inner));
        }
        if self.check_keyword(Keyword::Inner)? {
            self.advance()?;
            self.expect_keyword(Keyword::Join)?;
            return Ok(Some(JoinType::Inner));
        }
        if self.check_keyword(Keyword::Left)? {
            self.advance()?;
            self.expect_keyword(Keyword::Join)?;
            return Ok(Some(JoinType::Left));
        }
        Ok(None)
    }

    fn parse_order_by_expr(&mut self) -> Result<OrderByExpr> {
        let expr = self.parse_expression()?;
        let desc = if self.consume_keyword(Keyword::Desc)?.is_some() {
            true
        } else {
            self.consume_keyword(Keyword::Asc)?;
            false
        };
        Ok(OrderByExpr { expr, desc })
    }

    fn parse_unsigned(&mut self) -> Result<u64> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Integer(n) if n >= 0 => Ok(n as u64),
            _ => Err(Error::syntax(
                format!("expected non-negative integer, found {}", token.kind),
                token.line,
                token.column,
            )),
        }
    }

    pub(crate) fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.parse_identifier()?;

        let columns = if self.consume(&TokenKind::LeftParen)?.is_some() {
            let cols = self.parse_comma_separated(|p| p.parse_identifier())?;
            self.expect(&TokenKind::RightParen)?;
            cols
        } else {
            Vec::new()
        };

        self.expect_keyword(Keyword::Values)?;
        let values = self.parse_comma_separated(|p| {
            p.expect(&TokenKind::LeftParen)?;
            let row = p.parse_comma_separated(|p| p.parse_expression())?;
            p.expect(&TokenKind::RightParen)?;
            Ok(row)
        })?;

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            values,
        }))
    }

    pub(crate) fn parse_update(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.parse_identifier()?;
        self.expect_keyword(Keyword::Set)?;

        let assignments = self.parse_comma_separated(|p| {
            let column = p.parse_identifier()?;
            p.expect(&TokenKind::Eq)?;
            let value = p.parse_expression()?;
            Ok(Assignment { column, value })
        })?;

        let where_clause = if self.consume_keyword(Keyword::Where)?.is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Statement::Update(UpdateStatement {
            table,
            assignments,
            where_clause,
        }))
    }

    pub(crate) fn parse_delete(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.parse_identifier()?;

        let where_clause = if self.consume_keyword(Keyword::Where)?.is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Statement::Delete(DeleteStatement {
            table,
            where_clause,
        }))
    }

    pub(crate) fn parse_create(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Create)?;

        if self.consume_keyword(Keyword::Table)?.is_some() {
            return self.parse_create_table();
        }

        let unique = self.consume_keyword(Keyword::Unique)?.is_some();
        if self.consume_keyword(Keyword::Index)?.is_some() {
            return self.parse_create_index(unique);
        }

        let token = self.peek()?;
        Err(unexpected(token, "TABLE or INDEX"))
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        let name = self.parse_identifier()?;
        self.expect(&TokenKind::LeftParen)?;
        let columns = self.parse_comma_separated(|p| p.parse_column_def())?;
        self.expect(&TokenKind::RightParen)?;

        Ok(Statement::CreateTable(CreateTableStatement { name, columns }))
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.parse_identifier()?;
        let data_type = self.parse_data_type()?;

        let mut def = ColumnDef {
            name,
            data_type,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        };

        loop {
            if self.consume_keyword(Keyword::Primary)?.is_some() {
                self.expect_keyword(Keyword::Key)?;
                def.primary_key = true;
                def.not_null = true;
                def.unique = true;
            } else if self.check_keyword(Keyword::Not)? {
                self.advance()?;
                self.expect(&TokenKind::Null)?;
                def.not_null = true;
            } else if self.consume(&TokenKind::Null)?.is_some() {
                // explicit NULL, the default
            } else if self.consume_keyword(Keyword::Unique)?.is_some() {
                def.unique = true;
            } else if self.consume_keyword(Keyword::Default)?.is_some() {
                def.default = Some(self.parse_constant()?);
            } else {
                break;
            }
        }

        Ok(def)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let token = self.advance()?;
        let kw = match &token.kind {
            TokenKind::Keyword(kw) => *kw,
            _ => return Err(unexpected(&token, "data type")),
        };
        match kw {
            Keyword::Integer => Ok(DataType::Integer),
            Keyword::Float => Ok(DataType::Float),
            Keyword::Text => Ok(DataType::Text),
            Keyword::Boolean => Ok(DataType::Boolean),
            Keyword::Date => Ok(DataType::Date),
            Keyword::Timestamp => Ok(DataType::Timestamp),
            Keyword::Varchar => {
                self.expect(&TokenKind::LeftParen)?;
                let limit = self.parse_unsigned()?;
                if limit > u32::MAX as u64 {
                    return Err(Error::syntax(
                        format!("VARCHAR limit {} out of range", limit),
                        token.line,
                        token.column,
                    ));
                }
                self.expect(&TokenKind::RightParen)?;
                Ok(DataType::Varchar(limit as u32))
            }
            _ => Err(unexpected(&token, "data type")),
        }
    }

    /// Parse a constant for a DEFAULT clause: a literal with an optional
    /// leading sign.
    fn parse_constant(&mut self) -> Result<Literal> {
        let negative = self.consume(&TokenKind::Minus)?.is_some();
        let token = self.advance()?;
        let lit = match token.kind {
            TokenKind::Null => Literal::Null,
            TokenKind::Integer(n) => Literal::Integer(if negative { -n } else { n }),
            TokenKind::Float(v) => Literal::Float(if negative { -v } else { v }),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::Boolean(b) => Literal::Boolean(b),
            _ => return Err(unexpected(&token, "literal")),
        };
        if negative && !matches!(lit, Literal::Integer(_) | Literal::Float(_)) {
            return Err(Error::syntax(
                "sign is only valid before a numeric literal",
                token.line,
                token.column,
            ));
        }
        Ok(lit)
    }

    fn parse_create_index(&mut self, unique: bool) -> Result<Statement> {
        let name = self.parse_identifier()?;
        self.expect_keyword(Keyword::On)?;
        let table = self.parse_identifier()?;
        self.expect(&TokenKind::LeftParen)?;
        let column = self.parse_identifier()?;
        self.expect(&TokenKind::RightParen)?;

        Ok(Statement::CreateIndex(CreateIndexStatement {
            name,
            table,
            column,
            unique,
        }))
    }

    pub(crate) fn parse_drop(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Drop)?;

        if self.consume_keyword(Keyword::Table)?.is_some() {
            let name = self.parse_identifier()?;
            return Ok(Statement::DropTable { name });
        }
        if self.consume_keyword(Keyword::Index)?.is_some() {
            let name = self.parse_identifier()?;
            return Ok(Statement::DropIndex { name });
        }

        let token = self.peek()?;
        Err(unexpected(token, "TABLE or INDEX"))
    }

    pub(crate) fn parse_show(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Show)?;
        self.expect_keyword(Keyword::Tables)?;
        Ok(Statement::ShowTables)
    }

    pub(crate) fn parse_describe(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Describe)?;
        let table = self.parse_identifier()?;
        Ok(Statement::Describe { table })
    }

    pub(crate) fn parse_truncate(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Truncate)?;
        self.consume_keyword(Keyword::Table)?;
        let table = self.parse_identifier()?;
        Ok(Statement::Truncate { table })
    }
}
