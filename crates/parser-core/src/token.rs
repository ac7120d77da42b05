use smol_str::SmolStr;

/// A lexical token together with its source position, used by the parser
/// to build `ParseError`s that point at the offending text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub raw: SmolStr,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<SmolStr>, line: usize, col: usize) -> Self {
        Self {
            kind,
            raw: raw.into(),
            line,
            col,
        }
    }
}

/// Every terminal the grammar can produce.
///
/// Keywords are case-sensitive and uppercase; anything else that looks
/// like an identifier lexes as `Ident` and the parser decides whether a
/// bare identifier is acceptable in that position (e.g. the `FROM`
/// source name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // keywords
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Granularity,
    Document,
    Sentence,
    Contains,
    Ner,
    Pos,
    Depends,
    Date,
    Title,
    Timestamp,
    Snippet,
    Window,
    Count,
    Documents,
    Unique,
    Near,
    Radius,
    ContainedBy,
    Intersect,
    Between,

    // punctuation / operators
    LParen,
    RParen,
    Comma,
    Star,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    EqEq,

    // literals / identifiers
    String,
    Int,
    Ident,
    Variable,

    Eof,
}

impl TokenKind {
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match s {
            "SELECT" => Select,
            "FROM" => From,
            "WHERE" => Where,
            "AND" => And,
            "OR" => Or,
            "NOT" => Not,
            "AS" => As,
            "ORDER" => Order,
            "BY" => By,
            "ASC" => Asc,
            "DESC" => Desc,
            "LIMIT" => Limit,
            "GRANULARITY" => Granularity,
            "DOCUMENT" => Document,
            "SENTENCE" => Sentence,
            "CONTAINS" => Contains,
            "NER" => Ner,
            "POS" => Pos,
            "DEPENDS" => Depends,
            "DATE" => Date,
            "TITLE" => Title,
            "TIMESTAMP" => Timestamp,
            "SNIPPET" => Snippet,
            "WINDOW" => Window,
            "COUNT" => Count,
            "DOCUMENTS" => Documents,
            "UNIQUE" => Unique,
            "NEAR" => Near,
            "RADIUS" => Radius,
            "CONTAINED_BY" => ContainedBy,
            "INTERSECT" => Intersect,
            "BETWEEN" => Between,
            _ => return None,
        })
    }
}
