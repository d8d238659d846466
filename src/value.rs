use std::fmt;

use serde::{Serialize, Serializer};

/// Why a value could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Undefined {
    /// The attribute was empty in the source table.
    Missing,
    /// A ratio had a zero denominator.
    ZeroDenominator,
    /// A logarithm was taken of zero or a negative number.
    NonPositiveLog,
    /// The source or an intermediate result was infinite or NaN.
    NonFinite,
}

impl fmt::Display for Undefined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Undefined::Missing => write!(f, "missing"),
            Undefined::ZeroDenominator => write!(f, "division by zero"),
            Undefined::NonPositiveLog => write!(f, "log of non-positive value"),
            Undefined::NonFinite => write!(f, "non-finite value"),
        }
    }
}

/// A numeric attribute that is either a finite number or undefined with a reason.
///
/// Aggregates never see NaN: they must pick every `Valid` value and say how
/// many `Undefined` ones they dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Valid(f64),
    Undefined(Undefined),
}

impl Value {
    /// Wrap a raw float, tagging NaN and infinities.
    #[inline]
    pub fn new(x: f64) -> Self {
        if x.is_finite() { Value::Valid(x) } else { Value::Undefined(Undefined::NonFinite) }
    }

    /// Wrap an optional float, tagging `None` as missing.
    #[inline]
    pub fn from_option(x: Option<f64>) -> Self {
        x.map_or(Value::Undefined(Undefined::Missing), Value::new)
    }

    #[inline] pub fn get(self) -> Option<f64> {
        match self { Value::Valid(x) => Some(x), Value::Undefined(_) => None }
    }

    #[inline] pub fn is_valid(self) -> bool { matches!(self, Value::Valid(_)) }

    #[inline] pub fn reason(self) -> Option<Undefined> {
        match self { Value::Valid(_) => None, Value::Undefined(reason) => Some(reason) }
    }

    /// `self / other`, undefined when `other` is zero.
    pub fn ratio(self, other: Value) -> Value {
        match (self, other) {
            (Value::Undefined(r), _) | (_, Value::Undefined(r)) => Value::Undefined(r),
            (Value::Valid(_), Value::Valid(d)) if d == 0.0 => Value::Undefined(Undefined::ZeroDenominator),
            (Value::Valid(n), Value::Valid(d)) => Value::new(n / d),
        }
    }

    /// Natural logarithm, undefined for non-positive input.
    pub fn ln(self) -> Value {
        match self {
            Value::Valid(x) if x <= 0.0 => Value::Undefined(Undefined::NonPositiveLog),
            Value::Valid(x) => Value::new(x.ln()),
            undefined => undefined,
        }
    }

    #[inline]
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Value {
        match self { Value::Valid(x) => Value::new(f(x)), undefined => undefined }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self { Value::new(x) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Valid(x) => match f.precision() {
                Some(p) => write!(f, "{x:.p$}"),
                None => write!(f, "{x}"),
            },
            Value::Undefined(reason) => write!(f, "undefined ({reason})"),
        }
    }
}

/// Serialized as a number, or `null` when undefined.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

/// Collect the valid values of a column together with the number dropped.
pub fn valid_values(values: &[Value]) -> (Vec<f64>, usize) {
    let valid = values.iter().filter_map(|v| v.get()).collect::<Vec<_>>();
    let dropped = values.len() - valid.len();
    (valid, dropped)
}
