use thiserror::Error;

use crate::range::Range;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{1}`")]
    UnexpectedCharacter(Range, char),
    #[error("Unterminated string literal")]
    UnterminatedString(Range),
}

impl LexerError {
    #[cold]
    pub fn range(&self) -> &Range {
        match self {
            LexerError::UnexpectedCharacter(range, _) => range,
            LexerError::UnterminatedString(range) => range,
        }
    }
}
