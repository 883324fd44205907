//! Token definitions for the SQL lexer.

use std::fmt;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The original text of this token.
    pub text: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }

    /// Check if this token is a specific keyword.
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if *k == kw)
    }

    /// Check if this is an EOF token.
    pub fn is_eof(&self) -> bool {
        matches!(&self.kind, TokenKind::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Identifiers and keywords
    Identifier(String),
    Keyword(Keyword),

    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,

    // Operators
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /

    // Comparison operators
    Eq,    // =
    NotEq, // != or <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=

    // Punctuation
    LeftParen,  // (
    RightParen, // )
    Comma,      // ,
    Semicolon,  // ;
    Dot,        // .

    // End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::Keyword(kw) => write!(f, "keyword {}", kw),
            TokenKind::Integer(n) => write!(f, "integer {}", n),
            TokenKind::Float(n) => write!(f, "float {}", n),
            TokenKind::String(s) => write!(f, "string '{}'", s),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Null => write!(f, "NULL"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::LeftParen => write!(f, "("),
            TokenKind::RightParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// SQL keywords recognized by the lexer (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    And,
    As,
    Asc,
    Avg,
    Between,
    Boolean,
    By,
    Count,
    Create,
    Date,
    Default,
    Delete,
    Desc,
    Describe,
    Distinct,
    Drop,
    Float,
    From,
    Group,
    Having,
    In,
    Index,
    Inner,
    Insert,
    Integer,
    Into,
    Is,
    Join,
    Key,
    Left,
    Like,
    Limit,
    Max,
    Min,
    Not,
    Offset,
    On,
    Or,
    Order,
    Primary,
    Select,
    Set,
    Show,
    Sum,
    Table,
    Tables,
    Text,
    Timestamp,
    Truncate,
    Unique,
    Update,
    Values,
    Varchar,
    Where,
    // Literal keywords, lexed into dedicated token kinds
    True,
    False,
    Null,
}

impl Keyword {
    /// Try to parse a keyword from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Keyword> {
        let upper = s.to_uppercase();
        KEYWORD_MAP().get(upper.as_str()).copied()
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_uppercase())
    }
}

// Static keyword map for O(1) lookup
lazy_static_keyword_map! {
    KEYWORD_MAP = {
        "AND" => And,
        "AS" => As,
        "ASC" => Asc,
        "AVG" => Avg,
        "BETWEEN" => Between,
        "BOOLEAN" => Boolean,
        "BY" => By,
        "COUNT" => Count,
        "CREATE" => Create,
        "DATE" => Date,
        "DEFAULT" => Default,
        "DELETE" => Delete,
        "DESC" => Desc,
        "DESCRIBE" => Describe,
        "DISTINCT" => Distinct,
        "DROP" => Drop,
        "FALSE" => False,
        "FLOAT" => Float,
        "FROM" => From,
        "GROUP" => Group,
        "HAVING" => Having,
        "IN" => In,
        "INDEX" => Index,
        "INNER" => Inner,
        "INSERT" => Insert,
        "INTEGER" => Integer,
        "INTO" => Into,
        "IS" => Is,
        "JOIN" => Join,
        "KEY" => Key,
        "LEFT" => Left,
        "LIKE" => Like,
        "LIMIT" => Limit,
        "MAX" => Max,
        "MIN" => Min,
        "NOT" => Not,
        "NULL" => Null,
        "OFFSET" => Offset,
        "ON" => On,
        "OR" => Or,
        "ORDER" => Order,
        "PRIMARY" => Primary,
        "SELECT" => Select,
        "SET" => Set,
        "SHOW" => Show,
        "SUM" => Sum,
        "TABLE" => Table,
        "TABLES" => Tables,
        "TEXT" => Text,
        "TIMESTAMP" => Timestamp,
        "TRUE" => True,
        "TRUNCATE" => Truncate,
        "UNIQUE" => Unique,
        "UPDATE" => Update,
        "VALUES" => Values,
        "VARCHAR" => Varchar,
        "WHERE" => Where,
    }
}

/// Macro to generate a static keyword map without external dependencies.
macro_rules! lazy_static_keyword_map {
    ($name:ident = { $($key:literal => $value:ident),* $(,)? }) => {
        #[allow(non_snake_case)]
        fn $name() -> &'static std::collections::HashMap<&'static str, Keyword> {
            use std::collections::HashMap;
            use std::sync::OnceLock;

            static MAP: OnceLock<HashMap<&'static str, Keyword>> = OnceLock::new();

            MAP.get_or_init(|| {
                let mut map = HashMap::new();
                $(
                    map.insert($key, Keyword::$value);
                )*
                map
            })
        }
    };
}

use lazy_static_keyword_map;
