//! Typed input values: the capability trait the converter reads through, and
//! `Datum`, an in-memory record shaped like what an ORC reader hands back.
use std::fmt;

use crate::descriptor::Category;

// ------------------------------- Capability ------------------------------- //

/// Read-only view of an externally produced, already-decoded value.
///
/// Accessors for a category other than the one reported by [`TypedValue::category`]
/// return `None`; the converter treats that as a type mismatch.
pub trait TypedValue {
    /// `None` when the value is null.
    fn category(&self) -> Option<Category>;

    fn list_len(&self) -> Option<usize>;
    fn list_element(&self, index: usize) -> Option<&Self>;

    fn map_entries(&self) -> Option<Box<dyn Iterator<Item = (&Self, &Self)> + '_>>;

    /// Field at `position` in declaration order; `None` when the record does
    /// not carry that field.
    fn struct_field(&self, position: usize, name: &str) -> Option<&Self>;

    fn union_tag(&self) -> Option<usize>;
    fn union_payload(&self) -> Option<&Self>;

    fn primitive(&self) -> Option<&Scalar>;
}

// ------------------------------- Scalars ---------------------------------- //

/// Primitive payload of a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Backs both `string` and `varchar`.
    String(String),
    Char(char),
    Binary(Vec<u8>),
    Decimal(Decimal),
    /// Seconds since the epoch; `nanos` is always in `0..1_000_000_000`.
    Timestamp { seconds: i64, nanos: u32 },
    /// Milliseconds since the epoch at midnight UTC.
    Date { millis: i64 },
    /// `nanos` carries the same sign as `total_seconds`.
    IntervalDayTime { total_seconds: i64, nanos: i32 },
    IntervalYearMonth { total_months: i32 },
}

impl Scalar {
    /// Short name used in mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Boolean(_) => "boolean",
            Scalar::Byte(_) => "tinyint",
            Scalar::Short(_) => "smallint",
            Scalar::Int(_) => "int",
            Scalar::Long(_) => "bigint",
            Scalar::Float(_) => "float",
            Scalar::Double(_) => "double",
            Scalar::String(_) => "string",
            Scalar::Char(_) => "char",
            Scalar::Binary(_) => "binary",
            Scalar::Decimal(_) => "decimal",
            Scalar::Timestamp { .. } => "timestamp",
            Scalar::Date { .. } => "date",
            Scalar::IntervalDayTime { .. } => "interval_day_time",
            Scalar::IntervalYearMonth { .. } => "interval_year_month",
        }
    }
}

/// Fixed-point decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal {
    pub unscaled: i128,
    pub scale: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal `{0}`")]
pub struct DecimalParseError(pub String);

impl Decimal {
    pub fn new(unscaled: i128, scale: u8) -> Self {
        Self { unscaled, scale }
    }

    /// Nearest double. Lossy for values beyond 15–17 significant digits.
    pub fn to_f64(&self) -> f64 {
        // Going through the decimal text gets correct rounding from the std parser.
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Parses `[-+]digits[.digits][(e|E)[-+]digits]`, the forms JSON numbers
    /// print as included.
    pub fn parse(src: &str) -> Result<Self, DecimalParseError> {
        let err = || DecimalParseError(src.to_string());
        let s = src.trim();
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (mantissa, exponent) = match body.split_once(['e', 'E']) {
            Some((m, e)) => (m, e.parse::<i32>().map_err(|_| err())?),
            None => (body, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let digits = format!("{int_part}{frac_part}");
        let mut magnitude: i128 = if digits.is_empty() { 0 } else { digits.parse().map_err(|_| err())? };
        let mut scale = i64::try_from(frac_part.len()).map_err(|_| err())? - i64::from(exponent);
        if scale < 0 {
            let factor = u32::try_from(-scale).ok().and_then(|k| 10i128.checked_pow(k)).ok_or_else(err)?;
            magnitude = magnitude.checked_mul(factor).ok_or_else(err)?;
            scale = 0;
        }
        let scale = u8::try_from(scale).map_err(|_| err())?;
        Ok(Self { unscaled: if negative { -magnitude } else { magnitude }, scale })
    }

    /// Same value at `scale`, rounding half away from zero when digits are
    /// dropped. `None` when the widened value overflows.
    pub fn rescale(&self, scale: u8) -> Option<Self> {
        if scale >= self.scale {
            let factor = 10i128.checked_pow(u32::from(scale - self.scale))?;
            return Some(Self { unscaled: self.unscaled.checked_mul(factor)?, scale });
        }
        // past 10^38 every i128 rounds to zero
        let Some(divisor) = 10i128.checked_pow(u32::from(self.scale - scale)) else {
            return Some(Self { unscaled: 0, scale });
        };
        let (q, r) = (self.unscaled / divisor, self.unscaled % divisor);
        let round = if r.unsigned_abs() * 2 >= divisor.unsigned_abs() { self.unscaled.signum() } else { 0 };
        Some(Self { unscaled: q + round, scale })
    }

    /// Count of significant digits in the unscaled value (at least 1).
    pub fn digits(&self) -> u32 {
        self.unscaled.unsigned_abs().checked_ilog10().map_or(1, |d| d + 1)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

// ------------------------------- Datum ------------------------------------ //

/// In-memory typed record. Struct fields are positional, as in ORC rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Primitive(Scalar),
    List(Vec<Datum>),
    /// Entries in reader order; duplicate keys are allowed.
    Map(Vec<(Datum, Datum)>),
    Struct(Vec<Datum>),
    Union { tag: usize, value: Box<Datum> },
}

impl Datum {
    pub fn union(tag: usize, value: Datum) -> Self {
        Datum::Union { tag, value: Box::new(value) }
    }
}

impl From<Scalar> for Datum {
    fn from(s: Scalar) -> Self {
        Datum::Primitive(s)
    }
}

impl TypedValue for Datum {
    fn category(&self) -> Option<Category> {
        match self {
            Datum::Null => None,
            Datum::Primitive(_) => Some(Category::Primitive),
            Datum::List(_) => Some(Category::List),
            Datum::Map(_) => Some(Category::Map),
            Datum::Struct(_) => Some(Category::Struct),
            Datum::Union { .. } => Some(Category::Union),
        }
    }

    fn list_len(&self) -> Option<usize> {
        match self {
            Datum::List(xs) => Some(xs.len()),
            _ => None,
        }
    }

    fn list_element(&self, index: usize) -> Option<&Self> {
        match self {
            Datum::List(xs) => xs.get(index),
            _ => None,
        }
    }

    fn map_entries(&self) -> Option<Box<dyn Iterator<Item = (&Self, &Self)> + '_>> {
        match self {
            Datum::Map(entries) => Some(Box::new(entries.iter().map(|(k, v)| (k, v)))),
            _ => None,
        }
    }

    fn struct_field(&self, position: usize, _name: &str) -> Option<&Self> {
        match self {
            Datum::Struct(fields) => fields.get(position),
            _ => None,
        }
    }

    fn union_tag(&self) -> Option<usize> {
        match self {
            Datum::Union { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    fn union_payload(&self) -> Option<&Self> {
        match self {
            Datum::Union { value, .. } => Some(value),
            _ => None,
        }
    }

    fn primitive(&self) -> Option<&Scalar> {
        match self {
            Datum::Primitive(s) => Some(s),
            _ => None,
        }
    }
}
