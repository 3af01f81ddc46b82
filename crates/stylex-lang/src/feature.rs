use std::{collections::BTreeMap, fmt};

use itertools::Itertools;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, none_of},
    combinator::{all_consuming, map, map_res, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::value::Value;

/// Attribute bag of a feature.
pub type Properties = BTreeMap<String, Value>;

pub(crate) static EMPTY_PROPERTIES: Properties = BTreeMap::new();

/// One data record (a point, line or polygon) whose attributes drive styling.
///
/// Deserializes from plain objects as well as GeoJSON features; members other
/// than `id` and `properties` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, deserialize_with = "nullable_properties")]
    pub properties: Properties,
}

fn nullable_properties<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Properties>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Feature {
    pub fn new(properties: Properties) -> Self {
        Self {
            id: None,
            properties,
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Feature {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Feature::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(SmolStr),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// A property path such as `a`, `a.b`, `a['b c']` or `a[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath(SmallVec<[PathSegment; 4]>);

impl PropertyPath {
    const FEATURE_PREFIX: &'static str = "feature";

    pub fn new(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self(segments.into_iter().collect())
    }

    pub fn key(name: &str) -> Self {
        Self::new([PathSegment::Key(SmolStr::new(name))])
    }

    /// Parses the body of a `${...}` reference.
    ///
    /// A leading `feature` segment is dropped when more segments follow, so
    /// `${feature['height']}` and `${height}` name the same attribute. Text that
    /// is not a well-formed path names a single attribute verbatim.
    pub fn parse(source: &str) -> Self {
        let source = source.trim();

        match all_consuming(delimited(multispace0, path, multispace0)).parse(source) {
            Ok((_, segments)) => Self(segments).without_feature_prefix(),
            Err(_) => Self::key(source),
        }
    }

    /// Drops a leading `feature` segment when more segments follow.
    pub fn without_feature_prefix(mut self) -> Self {
        if self.0.len() > 1
            && matches!(self.0.first(), Some(PathSegment::Key(key)) if key == Self::FEATURE_PREFIX)
        {
            self.0.remove(0);
        }
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Resolves the path against a property bag; absent paths are `Undefined`.
    pub fn resolve(&self, properties: &Properties) -> Value {
        let mut segments = self.0.iter();

        let mut current = match segments.next() {
            Some(PathSegment::Key(root)) => match properties.get(root.as_str()) {
                Some(value) => value,
                None => return Value::Undefined,
            },
            Some(PathSegment::Index(index)) => match properties.get(&index.to_string()) {
                Some(value) => value,
                None => return Value::Undefined,
            },
            None => return Value::Undefined,
        };

        while let Some(segment) = segments.next() {
            match current.get(segment) {
                Some(value) => current = value,
                None => {
                    return segments.fold(current.member(segment), |value, segment| {
                        value.member(segment)
                    });
                }
            }
        }

        current.clone()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .enumerate()
                .map(|(i, segment)| match segment {
                    PathSegment::Key(key) if i == 0 => key.to_string(),
                    PathSegment::Key(key) => format!("[{:?}]", key.as_str()),
                    PathSegment::Index(index) => format!("[{}]", index),
                })
                .join("")
        )
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"), tag("$"))),
        many0(alt((alphanumeric1, tag("_"), tag("$")))),
    ))
    .parse(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    alt((
        value(String::new(), alt((tag("''"), tag("\"\"")))),
        delimited(
            char('\''),
            escaped_transform(
                none_of("'\\"),
                '\\',
                alt((value('\\', char('\\')), value('\'', char('\'')))),
            ),
            char('\''),
        ),
        delimited(
            char('"'),
            escaped_transform(
                none_of("\"\\"),
                '\\',
                alt((value('\\', char('\\')), value('"', char('"')))),
            ),
            char('"'),
        ),
    ))
    .parse(input)
}

fn bracket(input: &str) -> IResult<&str, PathSegment> {
    delimited(
        pair(char('['), multispace0),
        alt((
            map_res(digit1, |digits: &str| digits.parse::<usize>().map(PathSegment::Index)),
            map(quoted, |key| PathSegment::Key(SmolStr::new(key))),
        )),
        pair(multispace0, char(']')),
    )
    .parse(input)
}

fn path(input: &str) -> IResult<&str, SmallVec<[PathSegment; 4]>> {
    let (input, root) = alt((
        map(identifier, |name| PathSegment::Key(SmolStr::new(name))),
        bracket,
    ))
    .parse(input)?;
    let (input, rest) = many0(alt((
        map(preceded(char('.'), identifier), |name| {
            PathSegment::Key(SmolStr::new(name))
        }),
        bracket,
    )))
    .parse(input)?;

    let mut segments = SmallVec::with_capacity(rest.len() + 1);
    segments.push(root);
    segments.extend(rest);
    Ok((input, segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(name: &str) -> PathSegment {
        PathSegment::Key(SmolStr::new(name))
    }

    #[rstest]
    #[case::plain("height", vec![key("height")])]
    #[case::dotted("a.b.c", vec![key("a"), key("b"), key("c")])]
    #[case::bracket_single("a['b c']", vec![key("a"), key("b c")])]
    #[case::bracket_double("a[\"b\"]", vec![key("a"), key("b")])]
    #[case::index("list[0].name", vec![key("list"), PathSegment::Index(0), key("name")])]
    #[case::feature_prefix("feature['height']", vec![key("height")])]
    #[case::feature_dot("feature.height", vec![key("height")])]
    #[case::feature_alone("feature", vec![key("feature")])]
    #[case::whitespace("  name ", vec![key("name")])]
    #[case::verbatim("not a path", vec![key("not a path")])]
    #[case::empty_quoted("['']", vec![key("")])]
    fn test_parse(#[case] source: &str, #[case] expected: Vec<PathSegment>) {
        assert_eq!(PropertyPath::parse(source), PropertyPath::new(expected));
    }

    #[test]
    fn test_resolve() {
        let feature: Feature = serde_json::from_value(serde_json::json!({
            "type": "Feature",
            "geometry": null,
            "properties": {
                "name": "tower",
                "tags": ["a", "b"],
                "info": {"floors": 12}
            }
        }))
        .unwrap();

        assert_eq!(PropertyPath::parse("name").resolve(&feature.properties), Value::from("tower"));
        assert_eq!(PropertyPath::parse("tags[1]").resolve(&feature.properties), Value::from("b"));
        assert_eq!(PropertyPath::parse("tags.length").resolve(&feature.properties), Value::from(2usize));
        assert_eq!(
            PropertyPath::parse("info.floors").resolve(&feature.properties),
            Value::from(12.0)
        );
        assert_eq!(
            PropertyPath::parse("info.missing.deeper").resolve(&feature.properties),
            Value::Undefined
        );
        assert_eq!(PropertyPath::parse("missing").resolve(&feature.properties), Value::Undefined);
    }

    #[test]
    fn test_null_properties() {
        let feature: Feature =
            serde_json::from_str(r#"{"type": "Feature", "id": 3, "properties": null}"#).unwrap();
        assert!(feature.properties.is_empty());
        assert_eq!(feature.id, Some(Value::from(3.0)));
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyPath::parse("a['b'][2]").to_string(), "a[\"b\"][2]");
    }
}
