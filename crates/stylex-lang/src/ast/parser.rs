use std::{f64::consts, iter::Peekable, slice::Iter};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::constants;
use super::error::ParseError;
use super::node::{Args, Expr, Node};
use crate::{
    lexer::{
        Lexer,
        token::{Token, TokenKind},
    },
    number,
    range::Range,
    value::Value,
    variable::LiteralBinding,
};

/// Grammar configuration: binary operator table and named literals.
///
/// Custom binary operators are registered here, before the parser is built;
/// there is no global parser state.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    binary_operators: FxHashMap<SmolStr, u8>,
    literals: FxHashMap<SmolStr, Value>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            binary_operators: constants::BINARY_OPERATORS
                .iter()
                .map(|(symbol, precedence)| (SmolStr::new(symbol), *precedence))
                .collect(),
            literals: [
                ("true", Value::Bool(true)),
                ("false", Value::Bool(false)),
                ("null", Value::Null),
                ("undefined", Value::Undefined),
                ("NaN", Value::NAN),
                ("Infinity", Value::Number(number::INFINITE)),
                ("PI", Value::from(consts::PI)),
                ("E", Value::from(consts::E)),
            ]
            .into_iter()
            .map(|(name, value)| (SmolStr::new(name), value))
            .collect(),
        }
    }
}

impl ParserOptions {
    /// Registers a binary operator. Precedence `0` is raised to `1`, the loosest tier.
    pub fn binary_operator(mut self, symbol: impl Into<SmolStr>, precedence: u8) -> Self {
        self.binary_operators
            .insert(symbol.into(), precedence.max(constants::OR_PRECEDENCE));
        self
    }

    /// Registers a named literal such as `PI`.
    pub fn literal(mut self, name: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.literals.insert(name.into(), value.into());
        self
    }

    pub fn precedence(&self, symbol: &str) -> Option<u8> {
        self.binary_operators.get(symbol).copied()
    }

    pub fn binary_operators(&self) -> impl Iterator<Item = &SmolStr> {
        self.binary_operators.keys()
    }
}

#[derive(Debug, Clone)]
pub struct Parser {
    options: ParserOptions,
    lexer: Lexer,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        let lexer = Lexer::new(
            options
                .binary_operators()
                .cloned()
                .chain(constants::UNARY_OPERATORS.iter().map(SmolStr::new)),
        );

        Self { options, lexer }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses `text` into a raw syntax tree.
    ///
    /// Identifiers named by `bindings` parse as [`Expr::Bound`] references for
    /// the duration of this call only.
    pub fn parse(&self, text: &str, bindings: &[LiteralBinding]) -> Result<Node, ParseError> {
        let tokens = self.lexer.tokenize(text)?;
        let eof = match tokens.last() {
            Some(token) => token,
            None => return Err(ParseError::UnexpectedEOFDetected(Range::default())),
        };

        Grammar {
            tokens: tokens.iter().peekable(),
            eof,
            options: &self.options,
            bindings,
        }
        .parse()
    }
}

struct Grammar<'a> {
    tokens: Peekable<Iter<'a, Token>>,
    eof: &'a Token,
    options: &'a ParserOptions,
    bindings: &'a [LiteralBinding],
}

impl<'a> Grammar<'a> {
    fn parse(&mut self) -> Result<Node, ParseError> {
        let node = self.parse_expr()?;
        let token = self.next_token();

        if token.is_eof() {
            Ok(node)
        } else {
            Err(ParseError::UnexpectedToken(token.clone()))
        }
    }

    #[inline(always)]
    fn next_token(&mut self) -> &'a Token {
        self.tokens.next().unwrap_or(self.eof)
    }

    #[inline(always)]
    fn peek(&mut self) -> &'a Token {
        self.tokens.peek().copied().unwrap_or(self.eof)
    }

    #[inline(always)]
    fn parse_expr(&mut self) -> Result<Node, ParseError> {
        self.parse_conditional()
    }

    // The ternary is right-associative and binds loosest.
    fn parse_conditional(&mut self) -> Result<Node, ParseError> {
        let test = self.parse_binary_op(constants::OR_PRECEDENCE)?;

        if !matches!(self.peek().kind, TokenKind::Question) {
            return Ok(test);
        }
        self.next_token();

        let consequent = self.parse_conditional()?;
        let colon = self.next_token();

        if !matches!(colon.kind, TokenKind::Colon) {
            return Err(ParseError::ExpectedColon(colon.clone()));
        }

        let alternate = self.parse_conditional()?;
        let range = test.range.merge(&alternate.range);

        Ok(Node::new(
            range,
            Expr::Conditional(test, consequent, alternate),
        ))
    }

    fn parse_binary_op(&mut self, min_prec: u8) -> Result<Node, ParseError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let token = self.peek();
            let (op, prec) = match &token.kind {
                TokenKind::Operator(op) => match self.options.precedence(op) {
                    Some(prec) if prec >= min_prec => (op, prec),
                    _ => break,
                },
                _ => break,
            };
            self.next_token();

            let rhs = self.parse_binary_op(prec.saturating_add(1))?;
            let range = lhs.range.merge(&rhs.range);
            let expr = if op == constants::AND || op == constants::OR {
                Expr::Logical(op.clone(), lhs, rhs)
            } else {
                Expr::Binary(op.clone(), lhs, rhs)
            };

            lhs = Node::new(range, expr);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        let token = self.peek();

        match &token.kind {
            TokenKind::Operator(op) if constants::UNARY_OPERATORS.contains(&op.as_str()) => {
                self.next_token();
                let operand = self.parse_unary()?;
                let range = token.range.merge(&operand.range);
                Ok(Node::new(range, Expr::Unary(op.clone(), operand)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.parse_primary()?;

        loop {
            match &self.peek().kind {
                TokenKind::Dot => {
                    self.next_token();
                    let token = self.next_token();
                    let name = match &token.kind {
                        TokenKind::Ident(name) => name,
                        _ => return Err(Self::unexpected(token)),
                    };
                    let range = node.range.merge(&token.range);

                    node = Node::new(
                        range,
                        Expr::Member {
                            object: node,
                            property: Node::new(token.range, Expr::Ident(name.clone())),
                            computed: false,
                        },
                    );
                }
                TokenKind::LBracket => {
                    self.next_token();
                    let property = self.parse_expr()?;
                    let close = self.next_token();

                    if !matches!(close.kind, TokenKind::RBracket) {
                        return Err(ParseError::ExpectedClosingBracket(close.clone()));
                    }

                    let range = node.range.merge(&close.range);
                    node = Node::new(
                        range,
                        Expr::Member {
                            object: node,
                            property,
                            computed: true,
                        },
                    );
                }
                _ => break,
            }
        }

        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let token = self.next_token();

        match &token.kind {
            TokenKind::NumberLiteral(n) => Ok(Node::new(token.range, Expr::Literal(Value::Number(*n)))),
            TokenKind::StringLiteral(s) => Ok(Node::new(
                token.range,
                Expr::Literal(Value::String(s.clone())),
            )),
            TokenKind::Ident(name) => self.parse_ident(token, name),
            TokenKind::LParen => {
                let node = self.parse_expr()?;
                let close = self.next_token();

                if matches!(close.kind, TokenKind::RParen) {
                    Ok(node)
                } else {
                    Err(ParseError::ExpectedClosingParen(close.clone()))
                }
            }
            TokenKind::LBracket => self.parse_array(token),
            _ => Err(Self::unexpected(token)),
        }
    }

    fn parse_ident(&mut self, token: &'a Token, name: &SmolStr) -> Result<Node, ParseError> {
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.next_token();
            let (args, close) = self.parse_args()?;
            return Ok(Node::new(
                token.range.merge(&close.range),
                Expr::Call(name.clone(), args),
            ));
        }

        let expr = if self.bindings.iter().any(|binding| binding.name == *name) {
            Expr::Bound(name.clone())
        } else if let Some(value) = self.options.literals.get(name) {
            Expr::Literal(value.clone())
        } else {
            Expr::Ident(name.clone())
        };

        Ok(Node::new(token.range, expr))
    }

    fn parse_args(&mut self) -> Result<(Args, &'a Token), ParseError> {
        let mut args = Args::new();

        if matches!(self.peek().kind, TokenKind::RParen) {
            return Ok((args, self.next_token()));
        }

        loop {
            args.push(self.parse_expr()?);
            let token = self.next_token();

            match &token.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => return Ok((args, token)),
                _ => return Err(ParseError::ExpectedClosingParen(token.clone())),
            }
        }
    }

    fn parse_array(&mut self, open: &'a Token) -> Result<Node, ParseError> {
        let mut elements = Vec::new();

        loop {
            if matches!(self.peek().kind, TokenKind::RBracket) {
                let close = self.next_token();
                return Ok(Node::new(open.range.merge(&close.range), Expr::Array(elements)));
            }

            elements.push(self.parse_expr()?);
            let token = self.next_token();

            match &token.kind {
                TokenKind::Comma => {}
                TokenKind::RBracket => {
                    return Ok(Node::new(open.range.merge(&token.range), Expr::Array(elements)));
                }
                _ => return Err(ParseError::ExpectedClosingBracket(token.clone())),
            }
        }
    }

    #[cold]
    fn unexpected(token: &Token) -> ParseError {
        if token.is_eof() {
            ParseError::UnexpectedEOFDetected(token.range)
        } else {
            ParseError::UnexpectedToken(token.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::error::LexerError;
    use crate::range::Position;
    use itertools::Itertools;
    use rstest::rstest;

    fn sexp(node: &Node) -> String {
        match &*node.expr {
            Expr::Literal(Value::String(s)) => format!("{:?}", s),
            Expr::Literal(value) => value.to_string(),
            Expr::Bound(name) => format!("${}", name),
            Expr::Ident(name) => name.to_string(),
            Expr::Member {
                object,
                property,
                computed,
            } => format!(
                "({} {} {})",
                if *computed { "[]" } else { "." },
                sexp(object),
                sexp(property)
            ),
            Expr::Array(elements) => format!("[{}]", elements.iter().map(sexp).join(" ")),
            Expr::Unary(op, operand) => format!("({} {})", op, sexp(operand)),
            Expr::Binary(op, lhs, rhs) | Expr::Logical(op, lhs, rhs) => {
                format!("({} {} {})", op, sexp(lhs), sexp(rhs))
            }
            Expr::Conditional(test, consequent, alternate) => format!(
                "(? {} {} {})",
                sexp(test),
                sexp(consequent),
                sexp(alternate)
            ),
            Expr::Call(name, args) => format!("({}{})", name, args.iter().map(|arg| format!(" {}", sexp(arg))).join("")),
        }
    }

    fn parse(text: &str) -> Result<String, ParseError> {
        Parser::default().parse(text, &[]).map(|node| sexp(&node))
    }

    #[rstest]
    #[case::precedence("1 + 2 * 3", "(+ 1 (* 2 3))")]
    #[case::left_assoc("1 - 2 - 3", "(- (- 1 2) 3)")]
    #[case::parens("(1 + 2) * 3", "(* (+ 1 2) 3)")]
    #[case::relational_over_equality("a < 1 == b >= 2", "(== (< a 1) (>= b 2))")]
    #[case::logical("a || b && c", "(|| a (&& b c))")]
    #[case::unary("!a && -b", "(&& (! a) (- b))")]
    #[case::unary_binds_tighter("-2 * +x", "(* (- 2) (+ x))")]
    #[case::ternary_right_assoc("a ? 1 : b ? 2 : 3", "(? a 1 (? b 2 3))")]
    #[case::ternary_lowest("a || b ? x + 1 : 'n'", "(? (|| a b) (+ x 1) \"n\")")]
    #[case::member_chain("a.b['c'][0]", "([] ([] (. a b) \"c\") 0)")]
    #[case::call("max(a, 2, min(b))", "(max a 2 (min b))")]
    #[case::call_no_args("f()", "(f)")]
    #[case::call_then_member("split(s, ',')[1]", "([] (split s \",\") 1)")]
    #[case::array("[1, 'a', [b],]", "[1 \"a\" [b]]")]
    #[case::empty_array("[]", "[]")]
    #[case::named_literals("true && NaN || undefined", "(|| (&& true NaN) undefined)")]
    #[case::null("null", "null")]
    fn test_parse(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse(input), Ok(expected.to_string()));
    }

    #[rstest]
    #[case::trailing_operator("1 +", "Unexpected EOF detected")]
    #[case::empty("", "Unexpected EOF detected")]
    #[case::unclosed_paren("(1 + 2", "Expected a closing parenthesis `)` but got `EOF` delimiter")]
    #[case::unclosed_args("f(1 2)", "Expected a closing parenthesis `)` but got `2` delimiter")]
    #[case::unclosed_index("a[1", "Expected a closing bracket `]` but got `EOF` delimiter")]
    #[case::missing_colon("a ? b", "Expected `:` in conditional expression but got `EOF`")]
    #[case::juxtaposed("a b", "Unexpected token `b`")]
    #[case::dot_paren("a.(b)", "Unexpected token `(`")]
    #[case::regex_op_not_registered("a =~ 'x'", "Unexpected character `=`")]
    fn test_parse_error(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse(input).unwrap_err().to_string(), expected);
    }

    #[test]
    fn test_parse_error_range() {
        let err = Parser::default().parse("1 +", &[]).unwrap_err();
        assert_eq!(
            err.range(),
            Range::new(Position::new(1, 4), Position::new(1, 4))
        );

        let err = Parser::default().parse("a # b", &[]).unwrap_err();
        assert!(matches!(err, ParseError::Lexer(LexerError::UnexpectedCharacter(_, '#'))));
        assert_eq!(err.range().start, Position::new(1, 3));
    }

    #[test]
    fn test_bindings_parse_as_bound_references() {
        let bindings = [LiteralBinding::new("__v0", Value::from(1.0))];
        let parser = Parser::default();

        assert_eq!(
            parser.parse("__v0 + __v1", &bindings).map(|node| sexp(&node)),
            Ok("(+ $__v0 __v1)".to_string())
        );
        assert_eq!(
            parser.parse("__v0 + __v1", &[]).map(|node| sexp(&node)),
            Ok("(+ __v0 __v1)".to_string())
        );
    }

    #[test]
    fn test_custom_binary_operators() {
        let parser = Parser::new(
            ParserOptions::default()
                .binary_operator(constants::MATCH, constants::EQUALITY_PRECEDENCE)
                .binary_operator(constants::NOT_MATCH, constants::EQUALITY_PRECEDENCE)
                .binary_operator("**", 11),
        );

        assert_eq!(
            parser.parse("name =~ 'a' && 2 * 3 ** 2 !~ 'b'", &[]).map(|node| sexp(&node)),
            Ok("(&& (=~ name \"a\") (!~ (* 2 (** 3 2)) \"b\"))".to_string())
        );
    }

    #[test]
    fn test_custom_literal() {
        let parser = Parser::new(ParserOptions::default().literal("TAU", 6.5));
        assert_eq!(
            parser.parse("TAU", &[]).map(|node| sexp(&node)),
            Ok("6.5".to_string())
        );
    }
}
