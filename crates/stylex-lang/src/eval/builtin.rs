use std::sync::LazyLock;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{number::Number, value::Value};

type Args = [Value];

#[derive(Clone, Debug)]
pub struct BuiltinFunction {
    pub num_params: ParamNum,
    pub func: fn(&Args) -> Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParamNum {
    Fixed(u8),
    Range(u8, u8),
}

impl ParamNum {
    pub fn to_num(&self) -> u8 {
        match self {
            ParamNum::Fixed(n) => *n,
            ParamNum::Range(min, _) => *min,
        }
    }

    pub fn max(&self) -> u8 {
        match self {
            ParamNum::Fixed(n) => *n,
            ParamNum::Range(_, max) => *max,
        }
    }

    /// Pads missing arguments with `undefined` and drops extra ones.
    pub fn fit(&self, args: &mut Vec<Value>) {
        let min = self.to_num() as usize;
        if args.len() < min {
            args.resize(min, Value::Undefined);
        }
        args.truncate(self.max() as usize);
    }
}

impl BuiltinFunction {
    pub fn new(num_params: ParamNum, func: fn(&Args) -> Value) -> Self {
        BuiltinFunction { num_params, func }
    }
}

#[inline(always)]
fn number(value: &Value) -> f64 {
    value.to_number().value()
}

#[inline(always)]
fn math1(args: &Args, f: fn(f64) -> f64) -> Value {
    match args {
        [a] => Value::Number(Number::new(f(number(a)))),
        _ => Value::NAN,
    }
}

#[inline(always)]
fn math2(args: &Args, f: fn(f64, f64) -> f64) -> Value {
    match args {
        [a, b] => Value::Number(Number::new(f(number(a), number(b)))),
        _ => Value::NAN,
    }
}

#[inline(always)]
fn string1(args: &Args, f: fn(&str) -> Value) -> Value {
    match args {
        [Value::String(s)] => f(s),
        [Value::Undefined | Value::Null] => Value::Undefined,
        [a] => f(&a.to_string()),
        _ => Value::Undefined,
    }
}

#[inline(always)]
fn string_predicate(args: &Args, f: fn(&str, &str) -> bool) -> Value {
    match args {
        [a, b] if !a.is_nullish() => Value::Bool(f(&a.as_str(), &b.as_str())),
        _ => Value::Bool(false),
    }
}

fn round(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn extremum(args: &Args, initial: f64, pick: fn(f64, f64) -> f64) -> Value {
    let mut result = initial;
    for arg in args {
        let n = number(arg);
        if n.is_nan() {
            return Value::NAN;
        }
        result = pick(result, n);
    }
    Value::Number(Number::new(result))
}

// Byte color channel from a 0..=255 number.
fn channel(value: f64) -> u8 {
    round(value.clamp(0.0, 255.0)) as u8
}

fn alpha(value: f64) -> Number {
    Number::new(value.clamp(0.0, 1.0))
}

fn rgb(r: f64, g: f64, b: f64, a: Option<f64>) -> Value {
    if [r, g, b, a.unwrap_or_default()].iter().any(|c| c.is_nan()) {
        return Value::Undefined;
    }

    match a {
        Some(a) => Value::String(format!(
            "rgba({}, {}, {}, {})",
            channel(r),
            channel(g),
            channel(b),
            alpha(a)
        )),
        None => Value::String(format!("rgb({}, {}, {})", channel(r), channel(g), channel(b))),
    }
}

// Hue, saturation and lightness in 0..=1.
fn hsl(h: f64, s: f64, l: f64, a: Option<f64>) -> Value {
    if [h, s, l].iter().any(|c| c.is_nan()) {
        return Value::Undefined;
    }

    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return rgb(l * 255.0, l * 255.0, l * 255.0, a);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |t: f64| {
        let t = t.rem_euclid(1.0);
        let c = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        c * 255.0
    };

    rgb(hue(h + 1.0 / 3.0), hue(h), hue(h - 1.0 / 3.0), a)
}

// Character-based slice, negative start counting from the end.
fn substr(s: &str, start: f64, length: Option<f64>) -> Value {
    let chars = s.chars().collect_vec();
    let len = chars.len() as f64;
    let start = if start.is_nan() { 0.0 } else { start.trunc() };
    let start = if start < 0.0 { (len + start).max(0.0) } else { start.min(len) };
    let length = match length {
        Some(length) if length.is_nan() => 0.0,
        Some(length) => length.trunc().clamp(0.0, len - start),
        None => len - start,
    };

    Value::String(
        chars[start as usize..(start + length) as usize]
            .iter()
            .collect(),
    )
}

fn at(value: &Value, index: f64) -> Value {
    if index.is_nan() {
        return Value::Undefined;
    }

    let index = index.trunc();
    let resolve = |len: usize| {
        let index = if index < 0.0 { len as f64 + index } else { index };
        (index >= 0.0 && index < len as f64).then_some(index as usize)
    };

    match value {
        Value::Array(values) => resolve(values.len())
            .and_then(|i| values.get(i).cloned())
            .unwrap_or_default(),
        Value::String(s) => resolve(s.chars().count())
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => Value::Undefined,
    }
}

fn join(values: &[Value], separator: &str) -> String {
    values
        .iter()
        .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
        .join(separator)
}

pub static BUILTIN_FUNCTIONS: LazyLock<FxHashMap<SmolStr, BuiltinFunction>> =
    LazyLock::new(|| {
        let mut map = FxHashMap::default();

        map.insert(
            SmolStr::new("abs"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::abs)),
        );
        map.insert(
            SmolStr::new("sqrt"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::sqrt)),
        );
        map.insert(
            SmolStr::new("cbrt"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::cbrt)),
        );
        map.insert(
            SmolStr::new("floor"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::floor)),
        );
        map.insert(
            SmolStr::new("ceil"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::ceil)),
        );
        map.insert(
            SmolStr::new("round"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, round)),
        );
        map.insert(
            SmolStr::new("trunc"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::trunc)),
        );
        map.insert(
            SmolStr::new("sign"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, sign)),
        );
        map.insert(
            SmolStr::new("exp"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::exp)),
        );
        map.insert(
            SmolStr::new("exp2"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::exp2)),
        );
        map.insert(
            SmolStr::new("log"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::ln)),
        );
        map.insert(
            SmolStr::new("log2"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::log2)),
        );
        map.insert(
            SmolStr::new("log10"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::log10)),
        );
        map.insert(
            SmolStr::new("pow"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| math2(args, f64::powf)),
        );
        map.insert(
            SmolStr::new("min"),
            BuiltinFunction::new(ParamNum::Range(0, u8::MAX), |args| {
                extremum(args, f64::INFINITY, f64::min)
            }),
        );
        map.insert(
            SmolStr::new("max"),
            BuiltinFunction::new(ParamNum::Range(0, u8::MAX), |args| {
                extremum(args, f64::NEG_INFINITY, f64::max)
            }),
        );
        map.insert(
            SmolStr::new("clamp"),
            BuiltinFunction::new(ParamNum::Fixed(3), |args| match args {
                [x, lo, hi] => {
                    let (x, lo, hi) = (number(x), number(lo), number(hi));
                    if lo.is_nan() || hi.is_nan() {
                        Value::NAN
                    } else if x < lo {
                        lo.into()
                    } else if x > hi {
                        hi.into()
                    } else {
                        x.into()
                    }
                }
                _ => Value::NAN,
            }),
        );
        map.insert(
            SmolStr::new("mix"),
            BuiltinFunction::new(ParamNum::Fixed(3), |args| match args {
                [a, b, t] => {
                    let (a, b, t) = (number(a), number(b), number(t));
                    (a + (b - a) * t).into()
                }
                _ => Value::NAN,
            }),
        );
        map.insert(
            SmolStr::new("fract"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, |x| x - x.floor())),
        );
        map.insert(
            SmolStr::new("sin"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::sin)),
        );
        map.insert(
            SmolStr::new("cos"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::cos)),
        );
        map.insert(
            SmolStr::new("tan"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::tan)),
        );
        map.insert(
            SmolStr::new("asin"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::asin)),
        );
        map.insert(
            SmolStr::new("acos"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::acos)),
        );
        map.insert(
            SmolStr::new("atan"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::atan)),
        );
        map.insert(
            SmolStr::new("atan2"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| math2(args, f64::atan2)),
        );
        map.insert(
            SmolStr::new("radians"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::to_radians)),
        );
        map.insert(
            SmolStr::new("degrees"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| math1(args, f64::to_degrees)),
        );
        map.insert(
            SmolStr::new("isNaN"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| match args {
                [a] => Value::Bool(a.to_number().is_nan()),
                _ => Value::Bool(false),
            }),
        );
        map.insert(
            SmolStr::new("isFinite"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| match args {
                [a] => Value::Bool(number(a).is_finite()),
                _ => Value::Bool(false),
            }),
        );
        map.insert(
            SmolStr::new("isDefined"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| match args {
                [a] => Value::Bool(!a.is_undefined()),
                _ => Value::Bool(false),
            }),
        );
        map.insert(
            SmolStr::new("isNull"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| match args {
                [a] => Value::Bool(matches!(a, Value::Null)),
                _ => Value::Bool(false),
            }),
        );
        map.insert(
            SmolStr::new("Number"),
            BuiltinFunction::new(ParamNum::Range(0, 1), |args| match args {
                [a] => Value::Number(a.to_number()),
                _ => Value::Number(Number::default()),
            }),
        );
        map.insert(
            SmolStr::new("String"),
            BuiltinFunction::new(ParamNum::Range(0, 1), |args| match args {
                [a] => Value::String(a.to_string()),
                _ => Value::String(String::new()),
            }),
        );
        map.insert(
            SmolStr::new("Boolean"),
            BuiltinFunction::new(ParamNum::Range(0, 1), |args| match args {
                [a] => Value::Bool(a.is_truthy()),
                _ => Value::Bool(false),
            }),
        );
        map.insert(
            SmolStr::new("upper"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| {
                string1(args, |s| s.to_uppercase().into())
            }),
        );
        map.insert(
            SmolStr::new("lower"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| {
                string1(args, |s| s.to_lowercase().into())
            }),
        );
        map.insert(
            SmolStr::new("trim"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| string1(args, |s| s.trim().into())),
        );
        map.insert(
            SmolStr::new("len"),
            BuiltinFunction::new(ParamNum::Fixed(1), |args| match args {
                [Value::String(s)] => s.chars().count().into(),
                [Value::Array(values)] => values.len().into(),
                [Value::Object(map)] => map.len().into(),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("concat"),
            BuiltinFunction::new(ParamNum::Range(0, u8::MAX), |args| {
                Value::String(args.iter().map(|a| a.to_string()).join(""))
            }),
        );
        map.insert(
            SmolStr::new("substr"),
            BuiltinFunction::new(ParamNum::Range(2, 3), |args| match args {
                [s, start] if !s.is_nullish() => substr(&s.as_str(), number(start), None),
                [s, start, length] if !s.is_nullish() => substr(
                    &s.as_str(),
                    number(start),
                    (!length.is_undefined()).then(|| number(length)),
                ),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("startsWith"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| {
                string_predicate(args, |s, prefix| s.starts_with(prefix))
            }),
        );
        map.insert(
            SmolStr::new("endsWith"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| {
                string_predicate(args, |s, suffix| s.ends_with(suffix))
            }),
        );
        map.insert(
            SmolStr::new("includes"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| match args {
                [Value::Array(values), needle] => Value::Bool(values.contains(needle)),
                _ => string_predicate(args, |s, needle| s.contains(needle)),
            }),
        );
        map.insert(
            SmolStr::new("replace"),
            BuiltinFunction::new(ParamNum::Fixed(3), |args| match args {
                [s, from, to] if !s.is_nullish() => {
                    Value::String(s.as_str().replace(from.as_str().as_ref(), &to.as_str()))
                }
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("split"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| match args {
                [s, Value::String(separator)] if !s.is_nullish() && separator.is_empty() => {
                    Value::Array(s.as_str().chars().map(|c| c.to_string().into()).collect())
                }
                [s, separator] if !s.is_nullish() => Value::Array(
                    s.as_str()
                        .split(separator.as_str().as_ref())
                        .map(Value::from)
                        .collect(),
                ),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("join"),
            BuiltinFunction::new(ParamNum::Range(1, 2), |args| match args {
                [Value::Array(values)] => Value::String(join(values, ",")),
                [Value::Array(values), Value::Undefined] => Value::String(join(values, ",")),
                [Value::Array(values), separator] => {
                    Value::String(join(values, &separator.as_str()))
                }
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("rgb"),
            BuiltinFunction::new(ParamNum::Fixed(3), |args| match args {
                [r, g, b] => rgb(number(r), number(g), number(b), None),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("rgba"),
            BuiltinFunction::new(ParamNum::Fixed(4), |args| match args {
                [r, g, b, a] => rgb(number(r), number(g), number(b), Some(number(a))),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("hsl"),
            BuiltinFunction::new(ParamNum::Fixed(3), |args| match args {
                [h, s, l] => hsl(number(h), number(s), number(l), None),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("hsla"),
            BuiltinFunction::new(ParamNum::Fixed(4), |args| match args {
                [h, s, l, a] => hsl(number(h), number(s), number(l), Some(number(a))),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("defaultValue"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| match args {
                [a, fallback] if a.is_nullish() => fallback.clone(),
                [a, _] => a.clone(),
                _ => Value::Undefined,
            }),
        );
        map.insert(
            SmolStr::new("at"),
            BuiltinFunction::new(ParamNum::Fixed(2), |args| match args {
                [value, index] => at(value, number(index)),
                _ => Value::Undefined,
            }),
        );

        map
    });

#[derive(Clone, Debug)]
pub struct BuiltinFunctionDoc {
    pub description: &'static str,
    pub params: &'static [&'static str],
}

const FUNCTION_DOCS: &[(&str, &str, &[&str])] = &[
    ("abs", "Returns the absolute value of the given number.", &["number"]),
    ("sqrt", "Returns the square root of the given number.", &["number"]),
    ("cbrt", "Returns the cube root of the given number.", &["number"]),
    ("floor", "Rounds the given number down.", &["number"]),
    ("ceil", "Rounds the given number up.", &["number"]),
    ("round", "Rounds the given number to the nearest integer, halves up.", &["number"]),
    ("trunc", "Removes the fractional part of the given number.", &["number"]),
    ("sign", "Returns 1, -1 or 0 depending on the sign of the given number.", &["number"]),
    ("exp", "Returns e raised to the given power.", &["number"]),
    ("exp2", "Returns 2 raised to the given power.", &["number"]),
    ("log", "Returns the natural logarithm of the given number.", &["number"]),
    ("log2", "Returns the base 2 logarithm of the given number.", &["number"]),
    ("log10", "Returns the base 10 logarithm of the given number.", &["number"]),
    ("pow", "Raises the base to the given exponent.", &["base", "exponent"]),
    ("min", "Returns the smallest of the given numbers.", &["numbers"]),
    ("max", "Returns the largest of the given numbers.", &["numbers"]),
    ("clamp", "Constrains the number to the range [min, max].", &["number", "min", "max"]),
    ("mix", "Linearly interpolates between a and b by t.", &["a", "b", "t"]),
    ("fract", "Returns the fractional part of the given number.", &["number"]),
    ("sin", "Returns the sine of an angle in radians.", &["radians"]),
    ("cos", "Returns the cosine of an angle in radians.", &["radians"]),
    ("tan", "Returns the tangent of an angle in radians.", &["radians"]),
    ("asin", "Returns the arcsine in radians.", &["number"]),
    ("acos", "Returns the arccosine in radians.", &["number"]),
    ("atan", "Returns the arctangent in radians.", &["number"]),
    ("atan2", "Returns the angle in radians of the point (x, y).", &["y", "x"]),
    ("radians", "Converts degrees to radians.", &["degrees"]),
    ("degrees", "Converts radians to degrees.", &["radians"]),
    ("isNaN", "Checks whether the value converts to NaN.", &["value"]),
    ("isFinite", "Checks whether the value converts to a finite number.", &["value"]),
    ("isDefined", "Checks whether the value is not undefined.", &["value"]),
    ("isNull", "Checks whether the value is null.", &["value"]),
    ("Number", "Converts the value to a number.", &["value"]),
    ("String", "Converts the value to a string.", &["value"]),
    ("Boolean", "Converts the value to a boolean.", &["value"]),
    ("upper", "Converts the string to uppercase.", &["string"]),
    ("lower", "Converts the string to lowercase.", &["string"]),
    ("trim", "Removes leading and trailing whitespace.", &["string"]),
    ("len", "Returns the length of a string, array or object.", &["value"]),
    ("concat", "Concatenates the string forms of the given values.", &["values"]),
    ("substr", "Returns a substring from start, optionally limited to length characters.", &["string", "start", "length"]),
    ("startsWith", "Checks whether the string starts with the prefix.", &["string", "prefix"]),
    ("endsWith", "Checks whether the string ends with the suffix.", &["string", "suffix"]),
    ("includes", "Checks whether a string or array contains the value.", &["haystack", "needle"]),
    ("replace", "Replaces every occurrence of a substring.", &["string", "from", "to"]),
    ("split", "Splits the string by the separator.", &["string", "separator"]),
    ("join", "Joins array elements with the separator, `,` by default.", &["array", "separator"]),
    ("rgb", "Builds a CSS rgb() color from 0-255 channels.", &["r", "g", "b"]),
    ("rgba", "Builds a CSS rgba() color from 0-255 channels and a 0-1 alpha.", &["r", "g", "b", "a"]),
    ("hsl", "Builds a CSS color from hue, saturation and lightness in 0-1.", &["h", "s", "l"]),
    ("hsla", "Builds a CSS color from hue, saturation, lightness and alpha in 0-1.", &["h", "s", "l", "a"]),
    ("defaultValue", "Returns the value unless it is null or undefined, else the fallback.", &["value", "fallback"]),
    ("at", "Returns the element at the index; negative indexes count from the end.", &["value", "index"]),
];

pub static BUILTIN_FUNCTION_DOC: LazyLock<FxHashMap<SmolStr, BuiltinFunctionDoc>> =
    LazyLock::new(|| {
        FUNCTION_DOCS
            .iter()
            .map(|&(name, description, params)| {
                (SmolStr::new(name), BuiltinFunctionDoc { description, params })
            })
            .collect()
    });
