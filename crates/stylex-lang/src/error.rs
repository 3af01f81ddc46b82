use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{
    ast::error::ParseError, eval::error::EvaluationError, lexer::error::LexerError, range::Range,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl InnerError {
    fn range(&self) -> Range {
        match self {
            InnerError::Parse(err) => err.range(),
            InnerError::Evaluation(err) => err.range(),
        }
    }
}

/// An error paired with the expression text it was raised for.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The expression text after normalization, define substitution and
    /// variable replacement.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: impl Into<InnerError>) -> Self {
        let source_code = source_code.into();
        let cause = cause.into();
        let range = cause.range();

        let location = match &cause {
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                let lines = source_code.lines();
                let line = lines.clone().count().max(1);
                let column = lines.last().map(|line| line.chars().count()).unwrap_or(0);
                SourceSpan::new(
                    SourceOffset::from_location(&source_code, line, column.max(1)),
                    1,
                )
            }
            _ => {
                let start = SourceOffset::from_location(
                    &source_code,
                    range.start.line as usize,
                    range.start.column,
                );
                let end = SourceOffset::from_location(
                    &source_code,
                    range.end.line as usize,
                    range.end.column,
                );
                SourceSpan::new(
                    start,
                    std::cmp::max(end.offset().saturating_sub(start.offset()), 1),
                )
            }
        };

        Self {
            cause,
            source_code,
            location,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self.cause, InnerError::Parse(_))
    }

    pub fn is_evaluation_error(&self) -> bool {
        matches!(self.cause, InnerError::Evaluation(_))
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match self.cause {
            InnerError::Parse(ParseError::Lexer(LexerError::UnexpectedCharacter(..))) => {
                "LexerError::UnexpectedCharacter"
            }
            InnerError::Parse(ParseError::Lexer(LexerError::UnterminatedString(_))) => {
                "LexerError::UnterminatedString"
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                "ParseError::UnexpectedEOFDetected"
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                "ParseError::ExpectedClosingParen"
            }
            InnerError::Parse(ParseError::ExpectedClosingBracket(_)) => {
                "ParseError::ExpectedClosingBracket"
            }
            InnerError::Parse(ParseError::ExpectedColon(_)) => "ParseError::ExpectedColon",
            InnerError::Evaluation(EvaluationError::UnknownFunction { .. }) => {
                "EvaluationError::UnknownFunction"
            }
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Parse(ParseError::Lexer(LexerError::UnexpectedCharacter(..))) => {
                "Check for characters that are not part of the expression language.".to_string()
            }
            InnerError::Parse(ParseError::Lexer(LexerError::UnterminatedString(_))) => {
                "Close the string literal with the quote it was opened with.".to_string()
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => {
                "Check for syntax errors or misplaced tokens.".to_string()
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                "Input ended unexpectedly. Check for missing operands or incomplete expressions."
                    .to_string()
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_))
            | InnerError::Parse(ParseError::ExpectedClosingBracket(_)) => {
                "Check for missing closing brackets or delimiters between arguments.".to_string()
            }
            InnerError::Parse(ParseError::ExpectedColon(_)) => {
                "A conditional expression needs both branches: `test ? a : b`.".to_string()
            }
            InnerError::Evaluation(EvaluationError::UnknownFunction { name, .. }) => {
                format!("'{name}' is not a builtin function. Run with --list-functions to see them.")
            }
        };

        Some(Box::new(msg))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lexer::token::{Token, TokenKind},
        range::Position,
    };
    use rstest::rstest;
    use smol_str::SmolStr;

    fn range(start: usize, end: usize) -> Range {
        Range::new(Position::new(1, start), Position::new(1, end))
    }

    #[rstest]
    #[case::unexpected_token(
        "a + )",
        InnerError::Parse(ParseError::UnexpectedToken(Token {
            range: range(5, 6),
            kind: TokenKind::RParen,
        })),
        SourceSpan::new(4.into(), 1),
        "ParseError::UnexpectedToken"
    )]
    #[case::unexpected_eof(
        "a +",
        InnerError::Parse(ParseError::UnexpectedEOFDetected(range(4, 4))),
        SourceSpan::new(2.into(), 1),
        "ParseError::UnexpectedEOFDetected"
    )]
    #[case::unknown_function(
        "1 + nope(a)",
        InnerError::Evaluation(EvaluationError::UnknownFunction {
            name: SmolStr::new("nope"),
            range: range(5, 12),
        }),
        SourceSpan::new(4.into(), 7),
        "EvaluationError::UnknownFunction"
    )]
    fn test_from_error(
        #[case] source: &str,
        #[case] cause: InnerError,
        #[case] location: SourceSpan,
        #[case] code: &str,
    ) {
        let err = Error::from_error(source, cause);
        assert_eq!(err.location, location);
        assert_eq!(err.source_code, source);
        assert_eq!(err.code().map(|c| c.to_string()), Some(code.to_string()));
        assert!(err.help().is_some());
    }
}
