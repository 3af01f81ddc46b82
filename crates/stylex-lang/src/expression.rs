use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    Engine, Error, Feature, Value,
    cache::RegexCache,
    compiler::Node,
    defines::Defines,
    eval::{Evaluator, error::EvaluationError},
    feature::EMPTY_PROPERTIES,
    variable::LiteralBinding,
};

/// A compiled expression bound to one feature.
///
/// Constructing an expression runs the full pipeline and fails on a parse
/// error; evaluating it never re-parses. The runtime tree is shared with every
/// other expression compiled from the same text by the same engine.
#[derive(Debug, Clone)]
pub struct Expression<'a> {
    text: String,
    node: Arc<Node>,
    bindings: Vec<LiteralBinding>,
    feature: Option<&'a Feature>,
    regexes: Arc<RegexCache>,
}

impl<'a> Expression<'a> {
    /// Compiles `text` with the global engine.
    pub fn new(text: &str, feature: Option<&'a Feature>, defines: &Defines) -> Result<Self, Error> {
        Engine::global().expression(text, feature, defines)
    }

    pub(crate) fn from_parts(
        text: String,
        node: Arc<Node>,
        bindings: Vec<LiteralBinding>,
        feature: Option<&'a Feature>,
        regexes: Arc<RegexCache>,
    ) -> Self {
        Self {
            text,
            node,
            bindings,
            feature,
            regexes,
        }
    }

    /// Evicts the global engine's cache entries for these inputs.
    pub fn clear_caches(text: &str, feature: Option<&Feature>, defines: &Defines) -> bool {
        Engine::global().clear_expression_caches(text, feature, defines)
    }

    pub fn evaluate(&self) -> Result<Value, EvaluationError> {
        let properties = self
            .feature
            .map_or(&EMPTY_PROPERTIES, Feature::properties);
        Evaluator::new(properties, &self.bindings, &self.regexes).eval(&self.node)
    }

    /// Like [`Expression::evaluate`], with the error located in the expression text.
    pub fn evaluate_with_diagnostics(&self) -> Result<Value, Error> {
        self.evaluate()
            .map_err(|err| Error::from_error(self.text.as_str(), err))
    }

    /// The text that was parsed, after every rewriting step.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn bindings(&self) -> &[LiteralBinding] {
        &self.bindings
    }

    pub fn feature(&self) -> Option<&'a Feature> {
        self.feature
    }
}

/// A style property: a literal value or `{ "expression": "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Expression { expression: String },
    Literal(serde_json::Value),
}

impl StyleValue {
    pub fn expression(text: impl Into<String>) -> Self {
        StyleValue::Expression {
            expression: text.into(),
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, StyleValue::Expression { .. })
    }

    /// Evaluates the expression against `feature`; literals pass through.
    pub fn resolve(
        &self,
        engine: &Engine,
        feature: Option<&Feature>,
        defines: &Defines,
    ) -> Result<Value, Error> {
        match self {
            StyleValue::Expression { expression } => engine
                .expression(expression, feature, defines)?
                .evaluate_with_diagnostics(),
            StyleValue::Literal(value) => Ok(value.clone().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_expression_without_feature() {
        let expression = Expression::new("1 + 2", None, &Defines::new()).unwrap();
        assert_eq!(expression.evaluate(), Ok(Value::from(3.0)));
        assert!(expression.feature().is_none());
    }

    #[test]
    fn test_expression_accessors() {
        let engine = Engine::default();
        let feature: Feature = [("name", "a")].into_iter().collect();
        let expression = engine
            .expression("'x' + ${name}", Some(&feature), &Defines::new())
            .unwrap();

        assert_eq!(expression.text(), "'x' + __v0");
        assert_eq!(
            expression.bindings(),
            &[LiteralBinding::new("__v0", Value::from("a"))]
        );
        assert_eq!(expression.evaluate(), Ok(Value::from("xa")));
    }

    #[test]
    fn test_evaluate_with_diagnostics() {
        let engine = Engine::default();
        let err = engine
            .expression("nope(1)", None, &Defines::new())
            .unwrap()
            .evaluate_with_diagnostics()
            .unwrap_err();

        assert!(err.is_evaluation_error());
        assert_eq!(err.source_code, "nope(1)");
    }

    #[rstest]
    #[case::expression(json!({"expression": "height * 2"}), Value::from(20.0))]
    #[case::number(json!(3), Value::from(3))]
    #[case::string(json!("red"), Value::from("red"))]
    #[case::object_without_expression(json!({"color": "red"}), Value::from(json!({"color": "red"})))]
    fn test_style_value(#[case] input: serde_json::Value, #[case] expected: Value) {
        let engine = Engine::default();
        let feature: Feature = [("height", 10)].into_iter().collect();
        let style: StyleValue = serde_json::from_value(input).unwrap();

        assert_eq!(
            style.resolve(&engine, Some(&feature), &Defines::new()),
            Ok(expected)
        );
    }

    #[test]
    fn test_style_value_parse_error() {
        let engine = Engine::default();
        let style = StyleValue::expression("1 +");
        assert!(style.is_expression());
        assert!(
            style
                .resolve(&engine, None, &Defines::new())
                .is_err_and(|err| err.is_parse_error())
        );
    }
}
