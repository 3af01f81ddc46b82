use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

/// A double-precision number with JavaScript-like formatting and comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Number(f64);

pub const NAN: Number = Number(f64::NAN);
pub const INFINITE: Number = Number(f64::INFINITY);

impl Number {
    pub const fn new(value: f64) -> Self {
        Number(value)
    }

    #[inline(always)]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Truncates toward zero, saturating at the `i64` bounds.
    pub fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    pub fn is_int(&self) -> bool {
        self.0.is_finite() && self.0.fract() == 0.0
    }

    /// The number as an array or string index, if it is a non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        (self.is_int() && self.0 >= 0.0 && self.0 <= usize::MAX as f64).then_some(self.0 as usize)
    }

    pub fn abs(&self) -> Self {
        Number(self.0.abs())
    }

    /// True for both `0` and `-0`.
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Number {
                fn from(n: $ty) -> Self {
                    Number(n as f64)
                }
            }
        )*
    };
}

impl_from_primitive!(i32, i64, usize, f64);

macro_rules! impl_binary_op {
    ($($trait:ident::$method:ident => $op:tt),*) => {
        $(
            impl $trait for Number {
                type Output = Number;

                #[inline(always)]
                fn $method(self, rhs: Number) -> Number {
                    Number(self.0 $op rhs.0)
                }
            }
        )*
    };
}

impl_binary_op!(
    Add::add => +,
    Sub::sub => -,
    Mul::mul => *,
    Div::div => /,
    Rem::rem => %
);

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number(-self.0)
    }
}

// NaN is unordered, so every comparison involving it is false.
impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;

        match n {
            n if n.is_nan() => f.write_str("NaN"),
            n if n.is_infinite() => f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" }),
            n if n == 0.0 => f.write_str("0"),
            n if n < 0.0 => write!(f, "-{}", Number(-n)),
            n => write_shortest(f, n),
        }
    }
}

// JavaScript's Number::toString for a finite positive number: plain notation
// for decimal exponents in -6..21, exponent notation otherwise.
fn write_shortest(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    let scientific = format!("{:e}", n);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits = mantissa.replace('.', "");
    let exponent = exponent.parse::<i32>().unwrap_or_default();
    let k = digits.len() as i32;
    let point = exponent + 1;

    match point {
        p if k <= p && p <= 21 => write!(f, "{}{}", digits, "0".repeat((p - k) as usize)),
        p if 0 < p && p <= 21 => {
            let (int, frac) = digits.split_at(p as usize);
            write!(f, "{}.{}", int, frac)
        }
        p if -6 < p && p <= 0 => write!(f, "0.{}{}", "0".repeat(-p as usize), digits),
        _ => {
            let sign = if exponent < 0 { '-' } else { '+' };
            let (first, rest) = digits.split_at(1);
            if rest.is_empty() {
                write!(f, "{}e{}{}", first, sign, exponent.abs())
            } else {
                write!(f, "{}.{}e{}{}", first, rest, sign, exponent.abs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::integer(150.0, "150")]
    #[case::negative_integer(-3.0, "-3")]
    #[case::fraction(0.25, "0.25")]
    #[case::trailing_zero(2.50, "2.5")]
    #[case::negative_zero(-0.0, "0")]
    #[case::nan(f64::NAN, "NaN")]
    #[case::infinity(f64::INFINITY, "Infinity")]
    #[case::negative_infinity(f64::NEG_INFINITY, "-Infinity")]
    #[case::large_integer(123456789012345680000.0, "123456789012345680000")]
    #[case::exponent_threshold(1e21, "1e+21")]
    #[case::large_fraction(1.5e300, "1.5e+300")]
    #[case::small(0.000001, "0.000001")]
    #[case::smaller(1e-7, "1e-7")]
    #[case::negative_small(-2.5e-8, "-2.5e-8")]
    #[case::mixed(123.456, "123.456")]
    fn test_display(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(Number::new(input).to_string(), expected);
    }

    #[rstest]
    #[case::sum(Number::new(120.0) + Number::new(30.0), "150")]
    #[case::difference(Number::new(8.0) - Number::new(10.0), "-2")]
    #[case::product(Number::new(1.5) * Number::new(4.0), "6")]
    #[case::quotient(Number::new(7.0) / Number::new(2.0), "3.5")]
    #[case::divide_by_zero(Number::new(1.0) / Number::new(0.0), "Infinity")]
    #[case::remainder(Number::new(-7.0) % Number::new(3.0), "-1")]
    #[case::remainder_by_zero(Number::new(7.0) % Number::new(0.0), "NaN")]
    #[case::negate(-Number::new(4.0), "-4")]
    fn test_arithmetic(#[case] result: Number, #[case] expected: &str) {
        assert_eq!(result.to_string(), expected);
    }

    #[rstest]
    #[case::less(1.0, 2.0, Some(Ordering::Less))]
    #[case::equal(2.0, 2.0, Some(Ordering::Equal))]
    #[case::nan_left(f64::NAN, 2.0, None)]
    #[case::nan_right(2.0, f64::NAN, None)]
    fn test_ordering(#[case] a: f64, #[case] b: f64, #[case] expected: Option<Ordering>) {
        assert_eq!(Number::new(a).partial_cmp(&Number::new(b)), expected);
    }

    #[rstest]
    #[case::zero(0.0, Some(0))]
    #[case::positive(3.0, Some(3))]
    #[case::negative(-1.0, None)]
    #[case::fraction(1.5, None)]
    #[case::nan(f64::NAN, None)]
    #[case::infinity(f64::INFINITY, None)]
    fn test_as_index(#[case] input: f64, #[case] expected: Option<usize>) {
        assert_eq!(Number::new(input).as_index(), expected);
    }
}
