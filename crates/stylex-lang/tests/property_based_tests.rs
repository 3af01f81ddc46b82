//! Property-based tests for compilation and evaluation.
use proptest::prelude::*;
use stylex_lang::{Defines, Engine, Feature, Value};

mod strategies {
    use super::*;

    /// Generates attribute names that are not reserved literal names
    pub fn attribute() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,8}".prop_filter("Avoid literal names", |s| {
            !matches!(s.as_str(), "true" | "false" | "null" | "undefined")
        })
    }

    /// Generates JSON scalars a feature attribute may hold
    pub fn scalar() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            any::<bool>().prop_map(serde_json::Value::from),
            (-1000i64..=1000).prop_map(serde_json::Value::from),
            (-1000.0f64..1000.0f64).prop_map(serde_json::Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(serde_json::Value::from),
            Just(serde_json::Value::Null),
        ]
    }

    /// Generates a binary arithmetic expression over two integers and its expected value
    pub fn arithmetic() -> impl Strategy<Value = (String, f64)> {
        (
            -100i32..100,
            1i32..100,
            prop::sample::select(vec!["+", "-", "*", "/", "%"]),
        )
            .prop_map(|(a, b, op)| {
                let (x, y) = (a as f64, b as f64);
                let expected = match op {
                    "+" => x + y,
                    "-" => x - y,
                    "*" => x * y,
                    "/" => x / y,
                    "%" => x % y,
                    _ => unreachable!(),
                };
                (format!("{} {} {}", a, op, b), expected)
            })
    }
}

fn feature(name: &str, value: serde_json::Value) -> Feature {
    serde_json::from_value(serde_json::json!({ "properties": { name: value } })).unwrap()
}

proptest! {
    #[test]
    fn arithmetic_agrees_with_f64((text, expected) in strategies::arithmetic()) {
        let engine = Engine::default();
        let value = engine.expression(&text, None, &Defines::new()).unwrap().evaluate().unwrap();
        prop_assert_eq!(value, Value::from(expected));
    }

    #[test]
    fn evaluation_is_deterministic(name in strategies::attribute(), value in strategies::scalar()) {
        let engine = Engine::default();
        let f = feature(&name, value);
        let text = format!("${{{name}}} ? ${{{name}}} + 1 : 'none'");

        let first = engine.expression(&text, Some(&f), &Defines::new()).unwrap().evaluate();
        let second = engine.expression(&text, Some(&f), &Defines::new()).unwrap().evaluate();
        prop_assert_eq!(format!("{:?}", first), format!("{:?}", second));
        prop_assert_eq!(engine.stats().parses, 1);
    }

    #[test]
    fn variable_reference_reads_the_current_value(
        name in strategies::attribute(),
        a in strategies::scalar(),
        b in strategies::scalar(),
    ) {
        let engine = Engine::default();
        let text = format!("${{{name}}}");

        for value in [a, b] {
            let f = feature(&name, value.clone());
            let result = engine.expression(&text, Some(&f), &Defines::new()).unwrap().evaluate().unwrap();
            prop_assert_eq!(result, Value::from(value));
        }
    }

    #[test]
    fn identifier_and_variable_reference_agree(name in strategies::attribute(), value in strategies::scalar()) {
        let engine = Engine::default();
        let f = feature(&name, value);

        let by_identifier = engine.expression(&format!("{name} == {name}"), Some(&f), &Defines::new())
            .unwrap()
            .evaluate();
        let by_variable = engine.expression(&format!("${{{name}}} == {name}"), Some(&f), &Defines::new())
            .unwrap()
            .evaluate();
        prop_assert_eq!(by_identifier, by_variable);
    }

    #[test]
    fn missing_attributes_never_fail(name in strategies::attribute()) {
        let engine = Engine::default();
        let text = format!("${{{name}}} + 1 > 0 || {name}.x[0] == null");
        prop_assert!(engine.expression(&text, None, &Defines::new()).unwrap().evaluate().is_ok());
    }
}
