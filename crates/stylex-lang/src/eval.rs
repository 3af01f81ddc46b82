pub mod builtin;
pub mod error;

use std::{borrow::Cow, cmp::Ordering};

use error::EvaluationError;
use regex_lite::Regex;

use crate::{
    cache::RegexCache,
    compiler::{BinaryOp, Call, LogicalOp, Node, UnaryOp},
    feature::{PathSegment, Properties},
    value::Value,
    variable::LiteralBinding,
};

/// Evaluates runtime trees against one feature's properties and the
/// literal bindings of one expression.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    properties: &'a Properties,
    bindings: &'a [LiteralBinding],
    regexes: &'a RegexCache,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        properties: &'a Properties,
        bindings: &'a [LiteralBinding],
        regexes: &'a RegexCache,
    ) -> Self {
        Self {
            properties,
            bindings,
            regexes,
        }
    }

    pub fn eval(&self, node: &Node) -> Result<Value, EvaluationError> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Identifier(path) => Ok(path.resolve(self.properties)),
            Node::Binding(name) => Ok(self
                .bindings
                .iter()
                .find(|binding| binding.name == *name)
                .map(|binding| binding.value.clone())
                .unwrap_or_default()),
            Node::Member(object, property) => {
                let object = self.eval(object)?;
                let property = self.eval(property)?;
                Ok(object.member(&to_segment(&property)))
            }
            Node::Array(elements) => elements
                .iter()
                .map(|element| self.eval(element))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Unary(op, operand) => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                    UnaryOp::Neg => Value::Number(-operand.to_number()),
                    UnaryOp::Plus => Value::Number(operand.to_number()),
                })
            }
            Node::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                Ok(self.eval_binary_op(*op, &lhs, &rhs))
            }
            Node::Logical(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                match (op, lhs.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }
            Node::Conditional(test, consequent, alternate) => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Node::Call(call) => self.eval_call(call),
        }
    }

    fn eval_call(&self, call: &Call) -> Result<Value, EvaluationError> {
        let function = call
            .function
            .ok_or_else(|| EvaluationError::UnknownFunction {
                name: call.name.clone(),
                range: call.range,
            })?;

        let mut args = call
            .args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;
        function.num_params.fit(&mut args);

        Ok((function.func)(&args))
    }

    fn eval_binary_op(&self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
        match op {
            BinaryOp::Add if is_concatenation(lhs) || is_concatenation(rhs) => {
                Value::String(format!("{}{}", lhs, rhs))
            }
            BinaryOp::Add => Value::Number(lhs.to_number() + rhs.to_number()),
            BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
            BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
            BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
            BinaryOp::Mod => Value::Number(lhs.to_number() % rhs.to_number()),
            BinaryOp::Eq => Value::Bool(lhs.loose_eq(rhs)),
            BinaryOp::Ne => Value::Bool(!lhs.loose_eq(rhs)),
            BinaryOp::Lt => Value::Bool(matches!(compare(lhs, rhs), Some(Ordering::Less))),
            BinaryOp::Lte => Value::Bool(matches!(
                compare(lhs, rhs),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Gt => Value::Bool(matches!(compare(lhs, rhs), Some(Ordering::Greater))),
            BinaryOp::Gte => Value::Bool(matches!(
                compare(lhs, rhs),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::Match => {
                Value::Bool(self.is_match(&lhs.as_str(), &rhs.as_str()) == Some(true))
            }
            BinaryOp::NotMatch => {
                Value::Bool(self.is_match(&lhs.as_str(), &rhs.as_str()) == Some(false))
            }
        }
    }

    /// Matches `input` against `pattern`; `None` when the pattern does not compile.
    fn is_match(&self, input: &str, pattern: &str) -> Option<bool> {
        self.regexes
            .get_or_compile(pattern, |pattern| Regex::new(&regex_source(pattern)).ok())
            .map(|regex| regex.is_match(input))
    }
}

fn to_segment(property: &Value) -> PathSegment {
    match property {
        Value::Number(n) => match n.as_index() {
            Some(index) => PathSegment::Index(index),
            None => PathSegment::Key(n.to_string().into()),
        },
        _ => PathSegment::Key(property.as_str().as_ref().into()),
    }
}

#[inline(always)]
fn is_concatenation(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => lhs.to_number().partial_cmp(&rhs.to_number()),
    }
}

// Accepts `/pattern/flags` literals; the `i`, `m` and `s` flags become inline flags.
fn regex_source(pattern: &str) -> Cow<'_, str> {
    let literal = pattern
        .strip_prefix('/')
        .and_then(|rest| rest.rfind('/').map(|end| (&rest[..end], &rest[end + 1..])))
        .filter(|(_, flags)| flags.chars().all(|c| "gimsuy".contains(c)));

    match literal {
        Some((body, flags)) => {
            let inline = flags.chars().filter(|c| "ims".contains(*c)).collect::<String>();
            if inline.is_empty() {
                Cow::Borrowed(body)
            } else {
                Cow::Owned(format!("(?{}){}", inline, body))
            }
        }
        None => Cow::Borrowed(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            constants,
            parser::{Parser, ParserOptions},
        },
        cache::CachePolicy,
        compiler::compile,
        feature::Feature,
    };
    use std::sync::Arc;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn feature() -> Feature {
        serde_json::from_value(json!({
            "properties": {
                "name": "Tower A",
                "height": 120,
                "floors": "12",
                "tags": ["office", "tall"],
                "info": {"year": 1999, "open": true},
                "empty": "",
                "nothing": null
            }
        }))
        .unwrap()
    }

    fn eval(text: &str, feature: &Feature) -> Result<Value, EvaluationError> {
        let parser = Parser::new(
            ParserOptions::default()
                .binary_operator(constants::MATCH, constants::EQUALITY_PRECEDENCE)
                .binary_operator(constants::NOT_MATCH, constants::EQUALITY_PRECEDENCE),
        );
        let bindings = [LiteralBinding::new("__v0", Value::from("bound"))];
        let node = compile(&parser.parse(text, &bindings).unwrap());
        let regexes = RegexCache::new(CachePolicy::Unbounded, Arc::default());
        Evaluator::new(feature.properties(), &bindings, &regexes).eval(&node)
    }

    #[rstest]
    #[case::arithmetic("1 + 2 * 3 - 4 / 2", Value::from(5.0))]
    #[case::modulo("-7 % 3", Value::from(-1.0))]
    #[case::string_number_coercion("floors * 2", Value::from(24.0))]
    #[case::concatenation("name + ' ' + height", Value::from("Tower A 120"))]
    #[case::bool_coercion("true + 1", Value::from(2.0))]
    #[case::null_coercion("nothing + 1", Value::from(1.0))]
    #[case::undefined_arithmetic("isNaN(missing + 1)", Value::Bool(true))]
    #[case::division_by_zero("1 / 0", Value::from(f64::INFINITY))]
    #[case::loose_eq("floors == 12", Value::Bool(true))]
    #[case::null_eq_undefined("nothing == missing", Value::Bool(true))]
    #[case::ne("name != 'Tower B'", Value::Bool(true))]
    #[case::string_compare("'apple' < 'banana'", Value::Bool(true))]
    #[case::numeric_compare("floors > 9", Value::Bool(true))]
    #[case::nan_compare("missing >= 0", Value::Bool(false))]
    #[case::and_yields_operand("height && name", Value::from("Tower A"))]
    #[case::or_yields_operand("empty || 'fallback'", Value::from("fallback"))]
    #[case::and_short_circuits("false && nope()", Value::Bool(false))]
    #[case::or_short_circuits("1 || nope()", Value::from(1.0))]
    #[case::conditional("height > 100 ? 'tall' : 'short'", Value::from("tall"))]
    #[case::conditional_untaken_branch("true ? 1 : nope()", Value::from(1.0))]
    #[case::not("!empty", Value::Bool(true))]
    #[case::unary_plus("+floors", Value::from(12.0))]
    #[case::nested_path("info.year", Value::from(1999.0))]
    #[case::index_path("tags[1]", Value::from("tall"))]
    #[case::length("tags.length", Value::from(2usize))]
    #[case::dynamic_member("tags[len(tags) - 1]", Value::from("tall"))]
    #[case::string_member("name[0]", Value::from("T"))]
    #[case::array_literal("[1, name][1]", Value::from("Tower A"))]
    #[case::missing_path("info.missing.deeper", Value::Undefined)]
    #[case::binding("__v0", Value::from("bound"))]
    #[case::named_literal("floor(PI)", Value::from(3.0))]
    #[case::call("max(height, 200)", Value::from(200.0))]
    #[case::regex_match("name =~ '^Tower'", Value::Bool(true))]
    #[case::regex_not_match("name !~ '^Tower'", Value::Bool(false))]
    #[case::regex_class("floors =~ '^\\d+$'", Value::Bool(true))]
    #[case::regex_flags("name =~ '/tower/i'", Value::Bool(true))]
    #[case::regex_number_coercion("height =~ '^12'", Value::Bool(true))]
    #[case::regex_invalid("name =~ '('", Value::Bool(false))]
    #[case::regex_invalid_not_match("name !~ '('", Value::Bool(false))]
    fn test_eval(feature: Feature, #[case] text: &str, #[case] expected: Value) {
        assert_eq!(eval(text, &feature), Ok(expected));
    }

    #[rstest]
    fn test_unknown_function(feature: Feature) {
        let err = eval("1 + nope(height)", &feature).unwrap_err();
        assert!(matches!(err, EvaluationError::UnknownFunction { ref name, .. } if name == "nope"));
        assert_eq!(err.to_string(), "Unknown function \"nope\"");
    }

    #[rstest]
    #[case::plain("a.c", "a.c")]
    #[case::flags("/a.c/gi", "(?i)a.c")]
    #[case::global_only("/a/g", "a")]
    #[case::not_a_literal("/a/x", "/a/x")]
    #[case::path("/usr/bin", "/usr/bin")]
    fn test_regex_source(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(regex_source(pattern), expected);
    }
}
