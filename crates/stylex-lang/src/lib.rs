//! `stylex-lang` parses, compiles and evaluates the small expression language
//! that map style sheets use to compute a feature's styling from its
//! attributes.
//!
//! An expression such as `height > 100 ? 'tall' : 'short'` goes through four
//! cached steps before it is evaluated: quote-escape normalization, define
//! substitution, `${path}` variable replacement and compilation to a runtime
//! tree. The tree is compiled once per text and shared by every feature.
//!
//! ## Examples
//!
//! ```rust
//! use stylex_lang::{Defines, Engine, Expression, Feature, Value};
//!
//! let feature: Feature = [("name", "Tower A"), ("kind", "office")].into_iter().collect();
//!
//! // Evaluate with the global engine
//! let expression = Expression::new("'[' + ${name} + ']'", Some(&feature), &Defines::new()).unwrap();
//! assert_eq!(expression.evaluate(), Ok(Value::from("[Tower A]")));
//!
//! // Defines are substituted before parsing
//! let defines: Defines = [("OFFICE", "'office'")].into_iter().collect();
//! let engine = Engine::default();
//! let expression = engine.expression("kind == OFFICE", Some(&feature), &defines).unwrap();
//! assert_eq!(expression.evaluate(), Ok(Value::Bool(true)));
//!
//! // Parse errors surface when the expression is built
//! assert!(engine.expression("1 +", None, &defines).is_err());
//! ```
mod ast;
mod cache;
mod compiler;
mod defines;
mod engine;
mod error;
mod eval;
mod expression;
mod feature;
mod lexer;
mod normalize;
mod number;
mod range;
mod value;
mod variable;

pub use ast::constants as operators;
pub use ast::error::ParseError;
pub use ast::node::Expr as AstExpr;
pub use ast::node::Node as AstNode;
pub use ast::parser::{Parser, ParserOptions};
pub use cache::{CachePolicy, CacheStats};
pub use compiler::{BinaryOp, Call as RuntimeCall, LogicalOp, Node as RuntimeNode, UnaryOp};
pub use defines::Defines;
pub use engine::{Engine, Options};
pub use error::{Error, InnerError};
pub use eval::builtin::{
    BUILTIN_FUNCTION_DOC, BUILTIN_FUNCTIONS, BuiltinFunction, BuiltinFunctionDoc, ParamNum,
};
pub use eval::error::EvaluationError;
pub use expression::{Expression, StyleValue};
pub use feature::{Feature, PathSegment, Properties, PropertyPath};
pub use lexer::error::LexerError;
pub use lexer::token::{Token, TokenKind};
pub use number::Number;
pub use range::{Position, Range};
pub use value::Value;
pub use variable::{LiteralBinding, VARIABLE_PREFIX};

/// Parses `code` with the global engine's grammar.
#[allow(clippy::result_large_err)]
pub fn parse(code: &str) -> Result<AstNode, Error> {
    Engine::global()
        .parser()
        .parse(code, &[])
        .map_err(|e| Error::from_error(code, e))
}

/// Compiles `code` with the global engine and evaluates it once against `feature`.
#[allow(clippy::result_large_err)]
pub fn evaluate(code: &str, feature: &Feature) -> Result<Value, Error> {
    Expression::new(code, Some(feature), &Defines::new())?.evaluate_with_diagnostics()
}
