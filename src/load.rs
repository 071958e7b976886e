//! Builds [`Datum`] records from JSON documents, guided by a descriptor.
//!
//! This is how the CLI and the tests obtain typed records without an ORC reader.
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::typed::{Datum, Decimal, Scalar};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("at {path}: {message}")]
pub struct LoadError {
    pub path: String,
    pub message: String,
}

/// Reads `json` as a value of type `ty`. `null` is accepted at every level.
pub fn datum_from_json(json: &Value, ty: &TypeDescriptor) -> Result<Datum, LoadError> {
    let mut path = String::from("$");
    load(json, ty, &mut path)
}

fn load(json: &Value, ty: &TypeDescriptor, path: &mut String) -> Result<Datum, LoadError> {
    if json.is_null() {
        return Ok(Datum::Null);
    }
    match ty {
        TypeDescriptor::Primitive { kind } => load_scalar(json, *kind).map(Datum::Primitive).map_err(|message| {
            LoadError { path: path.clone(), message }
        }),
        TypeDescriptor::List { element } => {
            let xs = json.as_array().ok_or_else(|| expected(path.as_str(), "an array", json))?;
            let mut out = Vec::with_capacity(xs.len());
            for (i, x) in xs.iter().enumerate() {
                out.push(nested(path, &format!("[{i}]"), |p| load(x, element, p))?);
            }
            Ok(Datum::List(out))
        }
        TypeDescriptor::Map { key, value } => match json {
            Value::Object(m) => {
                let mut out = Vec::with_capacity(m.len());
                for (k, v) in m {
                    let seg = format!(".{k}");
                    let kd = nested(path, &seg, |p| load_map_key(k, key, p))?;
                    let vd = nested(path, &seg, |p| load(v, value, p))?;
                    out.push((kd, vd));
                }
                Ok(Datum::Map(out))
            }
            // `[[k, v], ...]` keeps duplicate and non-text keys
            Value::Array(pairs) => {
                let mut out = Vec::with_capacity(pairs.len());
                for (i, pair) in pairs.iter().enumerate() {
                    let entry = nested(path, &format!("[{i}]"), |p| match pair.as_array().map(Vec::as_slice) {
                        Some([k, v]) => Ok((
                            nested(p, "[0]", |p| load(k, key, p))?,
                            nested(p, "[1]", |p| load(v, value, p))?,
                        )),
                        _ => Err(expected(p.as_str(), "a [key, value] pair", pair)),
                    })?;
                    out.push(entry);
                }
                Ok(Datum::Map(out))
            }
            other => Err(expected(path.as_str(), "an object or an array of pairs", other)),
        },
        TypeDescriptor::Struct { fields } => match json {
            Value::Object(m) => {
                let mut out = Vec::with_capacity(fields.len());
                for (name, field_ty) in fields {
                    let field = match m.get(name) {
                        Some(v) => nested(path, &format!(".{name}"), |p| load(v, field_ty, p))?,
                        None => Datum::Null,
                    };
                    out.push(field);
                }
                if let Some(extra) = m.keys().find(|k| !fields.contains_key(*k)) {
                    return Err(LoadError { path: path.clone(), message: format!("unknown field `{extra}`") });
                }
                Ok(Datum::Struct(out))
            }
            Value::Array(xs) => {
                if xs.len() > fields.len() {
                    return Err(LoadError {
                        path: path.clone(),
                        message: format!("{} positional fields for a struct of {}", xs.len(), fields.len()),
                    });
                }
                let mut out = Vec::with_capacity(xs.len());
                for (x, (name, field_ty)) in xs.iter().zip(fields) {
                    out.push(nested(path, &format!(".{name}"), |p| load(x, field_ty, p))?);
                }
                Ok(Datum::Struct(out))
            }
            other => Err(expected(path.as_str(), "an object or a positional array", other)),
        },
        TypeDescriptor::Union { members } => {
            let obj = json.as_object().ok_or_else(|| expected(path.as_str(), r#"{"tag": n, "value": v}"#, json))?;
            let tag = obj
                .get("tag")
                .and_then(Value::as_u64)
                .and_then(|t| usize::try_from(t).ok())
                .ok_or_else(|| LoadError { path: path.clone(), message: "union needs a numeric `tag`".into() })?;
            let member = members.get(tag).ok_or_else(|| LoadError {
                path: path.clone(),
                message: format!("union tag {tag} out of range for {} members", members.len()),
            })?;
            let payload = obj.get("value").unwrap_or(&Value::Null);
            let value = nested(path, &format!("<tag {tag}>"), |p| load(payload, member, p))?;
            Ok(Datum::union(tag, value))
        }
    }
}

/// Runs `f` with `segment` appended to `path`, restoring it afterwards.
fn nested<T>(
    path: &mut String,
    segment: &str,
    f: impl FnOnce(&mut String) -> Result<T, LoadError>,
) -> Result<T, LoadError> {
    let len = path.len();
    path.push_str(segment);
    let out = f(path);
    path.truncate(len);
    out
}

fn expected(path: &str, what: &str, found: &Value) -> LoadError {
    LoadError { path: path.to_string(), message: format!("expected {what}, found {}", json_kind(found)) }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Object keys are always text; reinterpret them under the declared key type.
fn load_map_key(key: &str, ty: &TypeDescriptor, path: &mut String) -> Result<Datum, LoadError> {
    let TypeDescriptor::Primitive { kind } = ty else {
        return Err(LoadError { path: path.clone(), message: format!("map key type `{ty}` is not primitive") });
    };
    let as_json = match kind {
        PrimitiveKind::String | PrimitiveKind::Varchar { .. } | PrimitiveKind::Char { .. } => {
            Value::String(key.to_string())
        }
        _ => serde_json::from_str(key).unwrap_or_else(|_| Value::String(key.to_string())),
    };
    load(&as_json, ty, path)
}

// ------------------------------- Scalars ---------------------------------- //

fn load_scalar(json: &Value, kind: PrimitiveKind) -> Result<Scalar, String> {
    use PrimitiveKind as K;
    let mismatch = || format!("expected {kind}, found {}", json_kind(json));
    match kind {
        K::Boolean => json.as_bool().map(Scalar::Boolean).ok_or_else(mismatch),
        K::Byte => int(json, kind).map(Scalar::Byte),
        K::Short => int(json, kind).map(Scalar::Short),
        K::Int => int(json, kind).map(Scalar::Int),
        K::Long => int(json, kind).map(Scalar::Long),
        // f32 narrowing is the declared type's precision
        K::Float => json.as_f64().map(|f| Scalar::Float(f as f32)).ok_or_else(mismatch),
        K::Double => json.as_f64().map(Scalar::Double).ok_or_else(mismatch),
        K::String => json.as_str().map(|s| Scalar::String(s.to_string())).ok_or_else(mismatch),
        K::Varchar { max_length } => {
            let s = json.as_str().ok_or_else(mismatch)?;
            // Hive truncates over-long varchar values on read
            Ok(Scalar::String(s.chars().take(max_length as usize).collect()))
        }
        K::Char { .. } => {
            let s = json.as_str().ok_or_else(mismatch)?;
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Scalar::Char(c)),
                _ => Err(format!("expected exactly one character for {kind}, found {s:?}")),
            }
        }
        K::Binary => {
            let s = json.as_str().ok_or_else(mismatch)?;
            BASE64.decode(s).map(Scalar::Binary).map_err(|e| format!("invalid base64: {e}"))
        }
        K::Decimal { precision, scale } => {
            let text = match json {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            let parsed = Decimal::parse(&text).map_err(|e| e.to_string())?;
            // Hive rounds to the declared scale, then rejects what no longer fits
            let fitted = parsed
                .rescale(scale)
                .filter(|d| d.digits() <= u32::from(precision))
                .ok_or_else(|| format!("{text} does not fit {kind}"))?;
            Ok(Scalar::Decimal(fitted))
        }
        K::Date => {
            let s = json.as_str().ok_or_else(mismatch)?;
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date `{s}`: {e}"))?;
            let millis = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
            millis.map(|millis| Scalar::Date { millis }).ok_or_else(|| format!("invalid date `{s}`"))
        }
        K::Timestamp | K::TimestampLocalTz => timestamp(json).ok_or_else(|| {
            format!("expected an RFC 3339 timestamp, `YYYY-MM-DD HH:MM:SS[.f]` or epoch millis, found {json}")
        }),
        K::IntervalDayTime => match json {
            Value::Number(n) => n
                .as_i64()
                .map(|total_seconds| Scalar::IntervalDayTime { total_seconds, nanos: 0 })
                .ok_or_else(mismatch),
            Value::Object(m) => {
                let total_seconds = m.get("seconds").and_then(Value::as_i64).ok_or_else(mismatch)?;
                let nanos = m.get("nanos").map_or(Some(0), Value::as_i64).ok_or_else(mismatch)?;
                let nanos = i32::try_from(nanos)
                    .ok()
                    .filter(|n| n.unsigned_abs() < 1_000_000_000)
                    .ok_or_else(|| format!("nanos {nanos} out of range"))?;
                Ok(Scalar::IntervalDayTime { total_seconds, nanos })
            }
            _ => Err(mismatch()),
        },
        K::IntervalYearMonth => int(json, kind).map(|total_months| Scalar::IntervalYearMonth { total_months }),
        K::Void | K::Unknown => Err(format!("cannot load a non-null value of type {kind}")),
    }
}

fn int<T: TryFrom<i64>>(json: &Value, kind: PrimitiveKind) -> Result<T, String> {
    let i = json.as_i64().ok_or_else(|| format!("expected {kind}, found {}", json_kind(json)))?;
    T::try_from(i).map_err(|_| format!("{i} out of range for {kind}"))
}

fn timestamp(json: &Value) -> Option<Scalar> {
    let dt = match json {
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?)?.naive_utc(),
        Value::String(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.naive_utc(),
            Err(_) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok()?,
        },
        _ => return None,
    };
    let utc = dt.and_utc();
    Some(Scalar::Timestamp { seconds: utc.timestamp(), nanos: utc.timestamp_subsec_nanos() })
}

// ------------------------------- Tests ------------------------------------ //
