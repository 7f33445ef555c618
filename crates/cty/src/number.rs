//! Exact arbitrary-precision numbers extended with the two infinities.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::ParseNumberError;

/// Exponents beyond this magnitude are rejected while parsing.
pub const MAX_EXPONENT: i64 = 10_000;

/// Fractional digits kept when rendering a non-terminating fraction.
const RENDER_DIGITS: usize = 32;

/// An exact number. Ordered `NegativeInfinity < Finite(_) < PositiveInfinity`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Number {
    NegativeInfinity,
    Finite(BigRational),
    PositiveInfinity,
}

impl Number {
    pub fn zero() -> Self {
        Number::Finite(BigRational::zero())
    }

    pub fn from_i64(value: i64) -> Self {
        Number::Finite(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn from_u64(value: u64) -> Self {
        Number::Finite(BigRational::from_integer(BigInt::from(value)))
    }

    pub fn from_bigint(value: BigInt) -> Self {
        Number::Finite(BigRational::from_integer(value))
    }

    /// Converts through the shortest decimal form that round-trips, so `0.1`
    /// becomes exactly one tenth. `NaN` has no representation.
    pub fn from_f64(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        if value.is_infinite() {
            return Some(if value > 0.0 {
                Number::PositiveInfinity
            } else {
                Number::NegativeInfinity
            });
        }
        Number::parse(&value.to_string()).ok()
    }

    /// Parses decimal notation: optional sign, digits with an optional
    /// fraction, and an optional exponent. `inf` and `infinity` are accepted
    /// in any case.
    pub fn parse(text: &str) -> Result<Self, ParseNumberError> {
        if text.is_empty() {
            return Err(ParseNumberError::Empty);
        }
        let (negative, unsigned) = match text.as_bytes()[0] {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        if unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity") {
            return Ok(if negative {
                Number::NegativeInfinity
            } else {
                Number::PositiveInfinity
            });
        }

        let syntax = || ParseNumberError::Syntax(text.to_string());
        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
            None => (unsigned, None),
        };
        let (whole, fraction) = match mantissa.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (mantissa, ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() && fraction.is_empty() {
            return Err(syntax());
        }
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(syntax());
        }

        let mut scale = -(fraction.len() as i64);
        if let Some(exponent) = exponent {
            let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
            if digits.is_empty() || !all_digits(digits) {
                return Err(syntax());
            }
            let value: i64 = exponent
                .parse()
                .map_err(|_| ParseNumberError::ExponentOutOfRange(text.to_string()))?;
            if value.abs() > MAX_EXPONENT {
                return Err(ParseNumberError::ExponentOutOfRange(text.to_string()));
            }
            scale += value;
        }

        let digits = format!("{whole}{fraction}");
        let mut numer = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(syntax)?;
        if negative {
            numer = -numer;
        }
        let value = if scale >= 0 {
            BigRational::from_integer(numer * pow10(scale as usize))
        } else {
            BigRational::new(numer, pow10(scale.unsigned_abs() as usize))
        };
        Ok(Number::Finite(value))
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Number::Finite(_))
    }

    pub fn is_infinite(&self) -> bool {
        !self.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Number::Finite(r) if r.is_zero())
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Finite(r) if r.is_integer())
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Number::NegativeInfinity => true,
            Number::Finite(r) => r.is_negative(),
            Number::PositiveInfinity => false,
        }
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Number::Finite(r) => Some(r),
            _ => None,
        }
    }

    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Number::Finite(r) if r.is_integer() => Some(r.to_integer()),
            _ => None,
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_bigint()?.to_i64()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_bigint()?.to_u64()
    }

    /// Nearest `f64`; very large magnitudes round to infinity.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::NegativeInfinity => f64::NEG_INFINITY,
            Number::PositiveInfinity => f64::INFINITY,
            Number::Finite(_) => self.to_string().parse().unwrap_or(f64::NAN),
        }
    }

    pub fn negate(&self) -> Self {
        match self {
            Number::NegativeInfinity => Number::PositiveInfinity,
            Number::Finite(r) => Number::Finite(-r),
            Number::PositiveInfinity => Number::NegativeInfinity,
        }
    }

    pub fn abs(&self) -> Self {
        match self {
            Number::Finite(r) => Number::Finite(r.abs()),
            _ => Number::PositiveInfinity,
        }
    }

    /// `None` for `inf + -inf`.
    pub fn checked_add(&self, other: &Number) -> Option<Self> {
        match (self, other) {
            (Number::Finite(a), Number::Finite(b)) => Some(Number::Finite(a + b)),
            (Number::PositiveInfinity, Number::NegativeInfinity)
            | (Number::NegativeInfinity, Number::PositiveInfinity) => None,
            (Number::Finite(_), inf) | (inf, _) => Some(inf.clone()),
        }
    }

    pub fn checked_sub(&self, other: &Number) -> Option<Self> {
        self.checked_add(&other.negate())
    }

    /// `None` for infinity times zero.
    pub fn checked_mul(&self, other: &Number) -> Option<Self> {
        match (self, other) {
            (Number::Finite(a), Number::Finite(b)) => Some(Number::Finite(a * b)),
            _ if self.is_zero() || other.is_zero() => None,
            _ => Some(infinity(self.is_negative() != other.is_negative())),
        }
    }

    /// Dividing a non-zero number by zero yields a signed infinity; `0/0` and
    /// `inf/inf` have no result.
    pub fn checked_div(&self, other: &Number) -> Option<Self> {
        match (self, other) {
            (Number::Finite(a), Number::Finite(b)) => {
                if b.is_zero() {
                    if a.is_zero() {
                        None
                    } else {
                        Some(infinity(a.is_negative()))
                    }
                } else {
                    Some(Number::Finite(a / b))
                }
            }
            (Number::Finite(_), _) => Some(Number::zero()),
            (_, Number::Finite(b)) => Some(infinity(self.is_negative() != b.is_negative())),
            _ => None,
        }
    }

    /// Truncated remainder of two finite numbers; the result takes the sign
    /// of the dividend. `None` when either side is infinite or `other` is zero.
    pub fn checked_rem(&self, other: &Number) -> Option<Self> {
        let (Number::Finite(a), Number::Finite(b)) = (self, other) else {
            return None;
        };
        if b.is_zero() {
            return None;
        }
        let quotient = (a / b).trunc();
        Some(Number::Finite(a - quotient * b))
    }
}

fn infinity(negative: bool) -> Number {
    if negative {
        Number::NegativeInfinity
    } else {
        Number::PositiveInfinity
    }
}

fn pow10(exponent: usize) -> BigInt {
    num_traits::pow(BigInt::from(10), exponent)
}

/// Renders `magnitude / 10^scale` in plain decimal notation with trailing
/// fractional zeros removed.
fn render_scaled(negative: bool, magnitude: &BigInt, scale: usize) -> String {
    let mut digits = magnitude.to_string();
    if digits.len() <= scale {
        digits = format!("{}{digits}", "0".repeat(scale + 1 - digits.len()));
    }
    let point = digits.len() - scale;
    let (whole, fraction) = digits.split_at(point);
    let fraction = fraction.trim_end_matches('0');
    let mut out = String::new();
    let is_zero = whole.bytes().all(|b| b == b'0') && fraction.is_empty();
    if negative && !is_zero {
        out.push('-');
    }
    out.push_str(whole);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn render_rational(value: &BigRational) -> String {
    if value.is_integer() {
        return value.to_integer().to_string();
    }
    let negative = value.is_negative();
    let numer = value.numer().abs();
    let denom = value.denom().clone();

    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut rest = denom.clone();
    let (mut twos, mut fives) = (0usize, 0usize);
    while (&rest % &two).is_zero() {
        rest /= &two;
        twos += 1;
    }
    while (&rest % &five).is_zero() {
        rest /= &five;
        fives += 1;
    }

    if rest.is_one() {
        let scale = twos.max(fives);
        let scaled = numer * pow10(scale) / denom;
        return render_scaled(negative, &scaled, scale);
    }

    // Round half away from zero at the last kept digit.
    let scaled = (numer * pow10(RENDER_DIGITS) * &two + &denom) / (denom * &two);
    render_scaled(negative, &scaled, RENDER_DIGITS)
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::NegativeInfinity => f.write_str("-Inf"),
            Number::PositiveInfinity => f.write_str("+Inf"),
            Number::Finite(r) => f.write_str(&render_rational(r)),
        }
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Number {
    type Err = ParseNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::parse(s)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::from_i64(value)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Number::from_u64(value)
    }
}

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number::from_bigint(value)
    }
}

impl From<BigRational> for Number {
    fn from(value: BigRational) -> Self {
        Number::Finite(value)
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::zero()
    }
}
