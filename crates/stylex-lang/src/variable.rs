use itertools::Itertools;
use smol_str::{SmolStr, format_smolstr};

use crate::{
    feature::{Properties, PropertyPath},
    value::Value,
};

/// Prefix of the synthetic identifiers that stand in for `${...}` references.
pub const VARIABLE_PREFIX: &str = "__v";

const REFERENCE_START: &str = "${";

/// A synthetic identifier bound to the value it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralBinding {
    pub name: SmolStr,
    pub value: Value,
}

impl LiteralBinding {
    pub fn new(name: impl Into<SmolStr>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Expression text with every `${path}` reference replaced by a synthetic
/// identifier, and the path each identifier stands for.
///
/// A rewrite depends on the text alone, so it is safe to share between
/// features; values are bound per feature with [`Rewrite::bind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub text: String,
    pub variables: Vec<(SmolStr, PropertyPath)>,
}

impl Rewrite {
    /// Returns `None` when the text holds no references.
    pub fn scan(text: &str) -> Option<Rewrite> {
        if !text.contains(REFERENCE_START) {
            return None;
        }

        let mut rewriter = Rewriter::default();
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            match c {
                '"' | '\'' => {
                    let len = string_literal_len(rest, c);
                    rewriter.string_literal(&rest[..len], c);
                    rest = &rest[len..];
                }
                '$' if rest.starts_with(REFERENCE_START) => match rest.find('}') {
                    Some(end) => {
                        let name = rewriter.variable(&rest[REFERENCE_START.len()..end]);
                        rewriter.text.push_str(&name);
                        rest = &rest[end + 1..];
                    }
                    None => {
                        rewriter.text.push_str(rest);
                        rest = "";
                    }
                },
                _ => {
                    rewriter.text.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        if rewriter.variables.is_empty() {
            None
        } else {
            Some(Rewrite {
                text: rewriter.text,
                variables: rewriter.variables,
            })
        }
    }

    /// Resolves every variable against `properties`; absent paths bind `undefined`.
    pub fn bind(&self, properties: &Properties) -> Vec<LiteralBinding> {
        self.variables
            .iter()
            .map(|(name, path)| LiteralBinding::new(name.clone(), path.resolve(properties)))
            .collect()
    }
}

#[derive(Default)]
struct Rewriter {
    text: String,
    variables: Vec<(SmolStr, PropertyPath)>,
}

impl Rewriter {
    fn variable(&mut self, source: &str) -> SmolStr {
        let path = PropertyPath::parse(source);

        if let Some((name, _)) = self.variables.iter().find(|(_, p)| *p == path) {
            return name.clone();
        }

        let name = format_smolstr!("{}{}", VARIABLE_PREFIX, self.variables.len());
        self.variables.push((name.clone(), path));
        name
    }

    // 'a ${b} c' becomes ('a ' + String(__v0) + ' c').
    fn string_literal(&mut self, literal: &str, quote: char) {
        let body = literal
            .strip_prefix(quote)
            .and_then(|body| body.strip_suffix(quote));

        let body = match body {
            Some(body) if body.contains(REFERENCE_START) => body,
            _ => {
                self.text.push_str(literal);
                return;
            }
        };

        let mut parts = Vec::new();
        let mut rest = body;

        while let Some(start) = rest.find(REFERENCE_START) {
            let end = match rest[start..].find('}') {
                Some(end) => start + end,
                None => break,
            };

            if start > 0 {
                parts.push(format!("{quote}{}{quote}", &rest[..start]));
            }
            let name = self.variable(&rest[start + REFERENCE_START.len()..end]);
            parts.push(format!("String({})", name));
            rest = &rest[end + 1..];
        }

        if !parts.iter().any(|part| part.starts_with("String(")) {
            self.text.push_str(literal);
            return;
        }

        if !rest.is_empty() {
            parts.push(format!("{quote}{}{quote}", rest));
        }

        self.text.push('(');
        self.text.push_str(&parts.iter().join(" + "));
        self.text.push(')');
    }
}

// Length of the literal at the head of `text`, quotes included; the rest of
// the text when the literal is unterminated.
fn string_literal_len(text: &str, quote: char) -> usize {
    let mut chars = text.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            c if c == quote => return i + c.len_utf8(),
            _ => {}
        }
    }

    text.len()
}
