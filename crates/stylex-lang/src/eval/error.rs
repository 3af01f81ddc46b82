use smol_str::SmolStr;
use thiserror::Error;

use crate::range::Range;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Unknown function \"{name}\"")]
    UnknownFunction { name: SmolStr, range: Range },
}

impl EvaluationError {
    #[cold]
    pub fn range(&self) -> Range {
        match self {
            EvaluationError::UnknownFunction { range, .. } => *range,
        }
    }
}
