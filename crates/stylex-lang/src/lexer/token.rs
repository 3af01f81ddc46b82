use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::{number::Number, range::Range};

#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

#[derive(PartialEq, PartialOrd, Debug, Clone)]
pub enum TokenKind {
    Colon,
    Comma,
    Dot,
    Eof,
    Ident(SmolStr),
    LBracket,
    LParen,
    NumberLiteral(Number),
    Operator(SmolStr),
    Question,
    RBracket,
    RParen,
    StringLiteral(String),
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Eof => write!(f, ""),
            TokenKind::Ident(ident) => write!(f, "{}", ident),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::LParen => write!(f, "("),
            TokenKind::NumberLiteral(n) => write!(f, "{}", n),
            TokenKind::Operator(op) => write!(f, "{}", op),
            TokenKind::Question => write!(f, "?"),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::StringLiteral(s) => write!(f, "{:?}", s),
        }
    }
}
