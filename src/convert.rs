//! Descriptor-guided conversion of typed values into [`GenericValue`] trees.
//!
//! The walk is plain structural recursion: the descriptor node decides what the
//! value must look like, the value is read through [`TypedValue`], and every
//! primitive is normalized to one of the generic scalars. Any failure aborts the
//! whole conversion; there are no partial results.
use std::collections::BTreeMap;

use crate::config::{ConvertOptions, TimeUnit};
use crate::descriptor::{Category, PrimitiveKind, TypeDescriptor};
use crate::error::{ConvertError, PathSegment, ValuePath};
use crate::typed::{Scalar, TypedValue};
use crate::value::GenericValue;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Stateless apart from its options; one instance can serve any number of calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Converts `value` under `descriptor`. A null value converts to
    /// [`GenericValue::Null`] even without a descriptor.
    pub fn convert<V>(&self, value: &V, descriptor: Option<&TypeDescriptor>) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        if value.category().is_none() {
            return Ok(GenericValue::Null);
        }
        let descriptor = descriptor.ok_or(ConvertError::MissingSchema)?;
        let mut walk = Walk { options: &self.options, path: ValuePath::root(), depth: 0 };
        walk.value(value, descriptor)
    }
}

// ------------------------------- Walk ------------------------------------- //

struct Walk<'o> {
    options: &'o ConvertOptions,
    path: ValuePath,
    depth: usize,
}

impl Walk<'_> {
    fn value<V>(&mut self, value: &V, ty: &TypeDescriptor) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        let Some(category) = value.category() else {
            return Ok(GenericValue::Null);
        };
        if category != ty.category() {
            return Err(self.mismatch(ty.category(), category));
        }
        if self.depth >= self.options.max_depth {
            return Err(ConvertError::DepthLimitExceeded { path: self.path.clone(), limit: self.options.max_depth });
        }
        self.depth += 1;
        let out = match ty {
            TypeDescriptor::Primitive { kind } => self.primitive(value, *kind),
            TypeDescriptor::List { element } => self.list(value, element),
            TypeDescriptor::Map { key, value: val } => self.map(value, key, val),
            TypeDescriptor::Struct { fields } => self.structure(value, fields),
            TypeDescriptor::Union { members } => self.union(value, members),
        };
        self.depth -= 1;
        out
    }

    fn list<V>(&mut self, value: &V, element: &TypeDescriptor) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        let len = value.list_len().ok_or_else(|| self.malformed(Category::List))?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            self.path.push(PathSegment::Index(i));
            let item = match value.list_element(i) {
                Some(item) => self.value(item, element)?,
                None => return Err(self.malformed(Category::List)),
            };
            self.path.pop();
            out.push(item);
        }
        Ok(GenericValue::List(out))
    }

    fn map<V>(&mut self, value: &V, key_ty: &TypeDescriptor, value_ty: &TypeDescriptor) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        let entries = value.map_entries().ok_or_else(|| self.malformed(Category::Map))?;
        let mut out = BTreeMap::new();
        for (i, (k, v)) in entries.enumerate() {
            self.path.push(PathSegment::MapKey(i));
            let key = self.value(k, key_ty)?;
            self.path.pop();
            self.path.push(PathSegment::MapValue(i));
            let val = self.value(v, value_ty)?;
            self.path.pop();
            // last write wins on duplicate keys
            out.insert(key, val);
        }
        Ok(GenericValue::Map(out))
    }

    fn structure<V>(
        &mut self,
        value: &V,
        fields: &indexmap::IndexMap<String, TypeDescriptor>,
    ) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        let mut out = BTreeMap::new();
        for (position, (name, field_ty)) in fields.iter().enumerate() {
            self.path.push(PathSegment::Field(name.clone()));
            let converted = match value.struct_field(position, name) {
                Some(field) => self.value(field, field_ty)?,
                None => GenericValue::Null,
            };
            self.path.pop();
            out.insert(GenericValue::text(name.as_str()), converted);
        }
        Ok(GenericValue::Map(out))
    }

    fn union<V>(&mut self, value: &V, members: &[TypeDescriptor]) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        let tag = value.union_tag().ok_or_else(|| self.malformed(Category::Union))?;
        let Some(member) = members.get(tag) else {
            return Err(ConvertError::TypeMismatch {
                path: self.path.clone(),
                expected: format!("union tag below {}", members.len()),
                found: format!("tag {tag}"),
            });
        };
        let payload = value.union_payload().ok_or_else(|| self.malformed(Category::Union))?;
        self.path.push(PathSegment::Tag(tag));
        let out = self.value(payload, member)?;
        self.path.pop();
        Ok(out)
    }

    fn primitive<V>(&self, value: &V, kind: PrimitiveKind) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        if matches!(kind, PrimitiveKind::Void | PrimitiveKind::Unknown) {
            return Err(ConvertError::UnsupportedPrimitive { path: self.path.clone(), kind });
        }
        let Some(scalar) = value.primitive() else {
            return Ok(GenericValue::Null);
        };
        normalize(scalar, kind, self.options.time_unit).ok_or_else(|| ConvertError::TypeMismatch {
            path: self.path.clone(),
            expected: kind.type_name(),
            found: scalar.kind_name().to_string(),
        })
    }

    fn mismatch(&self, expected: Category, found: Category) -> ConvertError {
        ConvertError::TypeMismatch { path: self.path.clone(), expected: expected.to_string(), found: found.to_string() }
    }

    /// The value claimed `category` but its accessors disagree.
    fn malformed(&self, category: Category) -> ConvertError {
        ConvertError::TypeMismatch {
            path: self.path.clone(),
            expected: category.to_string(),
            found: format!("malformed {category}"),
        }
    }
}

// ------------------------------- Primitives ------------------------------- //

/// Maps a scalar to its generic form under `kind`; `None` when the scalar does
/// not belong to that primitive subkind.
fn normalize(scalar: &Scalar, kind: PrimitiveKind, unit: TimeUnit) -> Option<GenericValue> {
    use PrimitiveKind as K;
    let out = match (kind, scalar) {
        (K::Binary, Scalar::Binary(b)) => GenericValue::Bytes(b.clone()),
        (K::Boolean, Scalar::Boolean(b)) => GenericValue::Boolean(*b),
        (K::Double, Scalar::Double(d)) => GenericValue::float(*d),
        (K::Long, Scalar::Long(l)) => GenericValue::Integer(*l),
        (K::String | K::Varchar { .. }, Scalar::String(s)) => GenericValue::Text(s.clone()),
        (K::Char { .. }, Scalar::Char(c)) => GenericValue::Text(c.to_string()),
        (K::Byte, Scalar::Byte(b)) => GenericValue::Integer(i64::from(*b)),
        (K::Short, Scalar::Short(s)) => GenericValue::Integer(i64::from(*s)),
        (K::Int, Scalar::Int(i)) => GenericValue::Integer(i64::from(*i)),
        (K::Float, Scalar::Float(f)) => GenericValue::float(f64::from(*f)),
        // lossy by intent: wide decimals collapse to the nearest double
        (K::Decimal { .. }, Scalar::Decimal(d)) => GenericValue::float(d.to_f64()),
        (K::Timestamp | K::TimestampLocalTz, Scalar::Timestamp { seconds, nanos }) => {
            GenericValue::Integer(epoch_nanos_to_unit(*seconds, i64::from(*nanos), unit))
        }
        (K::Date, Scalar::Date { millis }) => {
            GenericValue::Integer(saturate(i128::from(*millis) * i128::from(unit.units_per_ms())))
        }
        (K::IntervalDayTime, Scalar::IntervalDayTime { total_seconds, nanos }) => {
            GenericValue::Integer(epoch_nanos_to_unit(*total_seconds, i64::from(*nanos), unit))
        }
        (K::IntervalYearMonth, Scalar::IntervalYearMonth { total_months }) => {
            GenericValue::Integer(i64::from(*total_months))
        }
        _ => return None,
    };
    Some(out)
}

/// `(seconds * 1e9 + nanos) / ns_per_unit`, truncating toward zero.
fn epoch_nanos_to_unit(seconds: i64, nanos: i64, unit: TimeUnit) -> i64 {
    let total = i128::from(seconds) * NANOS_PER_SECOND + i128::from(nanos);
    saturate(total / i128::from(unit.ns_per_unit()))
}

fn saturate(v: i128) -> i64 {
    i64::try_from(v).unwrap_or(if v < 0 { i64::MIN } else { i64::MAX })
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_spec::parse_type_spec;
    use crate::typed::{Datum, Decimal};

    fn convert(datum: &Datum, spec: &str) -> Result<GenericValue, ConvertError> {
        let ty = parse_type_spec(spec).unwrap();
        Converter::default().convert(datum, Some(&ty))
    }

    fn prim(s: Scalar) -> Datum {
        Datum::Primitive(s)
    }

    #[test]
    fn canonical_primitives_pass_through_unchanged() {
        assert_eq!(convert(&prim(Scalar::Boolean(true)), "boolean").unwrap(), GenericValue::Boolean(true));
        assert_eq!(convert(&prim(Scalar::Double(-2.25)), "double").unwrap(), GenericValue::float(-2.25));
        assert_eq!(convert(&prim(Scalar::Long(i64::MIN)), "bigint").unwrap(), GenericValue::Integer(i64::MIN));
        assert_eq!(convert(&prim(Scalar::String("héllo".into())), "string").unwrap(), GenericValue::text("héllo"));
        assert_eq!(convert(&prim(Scalar::String("v".into())), "varchar(8)").unwrap(), GenericValue::text("v"));
        assert_eq!(
            convert(&prim(Scalar::Binary(vec![0, 255, 7])), "binary").unwrap(),
            GenericValue::Bytes(vec![0, 255, 7])
        );
    }

    #[test]
    fn narrow_numbers_widen() {
        assert_eq!(convert(&prim(Scalar::Byte(42)), "tinyint").unwrap(), GenericValue::Integer(42));
        assert_eq!(convert(&prim(Scalar::Short(42)), "smallint").unwrap(), GenericValue::Integer(42));
        assert_eq!(convert(&prim(Scalar::Int(42)), "int").unwrap(), GenericValue::Integer(42));
        assert_eq!(convert(&prim(Scalar::Float(1.5)), "float").unwrap(), GenericValue::float(1.5));
        assert_eq!(convert(&prim(Scalar::Char('z')), "char(1)").unwrap(), GenericValue::text("z"));
    }

    #[test]
    fn decimal_converts_through_double() {
        let d = prim(Scalar::Decimal(Decimal::new(12345, 2)));
        assert_eq!(convert(&d, "decimal(10,2)").unwrap(), GenericValue::float(123.45));
    }

    #[test]
    fn temporal_values_use_the_configured_unit() {
        let ts = prim(Scalar::Timestamp { seconds: 1_700_000_000, nanos: 123_456_789 });
        let ty = parse_type_spec("timestamp").unwrap();
        let micros = Converter::default().convert(&ts, Some(&ty)).unwrap();
        assert_eq!(micros, GenericValue::Integer(1_700_000_000_123_456));
        let nanos = Converter::new(ConvertOptions::default().with_time_unit(TimeUnit::Nanoseconds))
            .convert(&ts, Some(&ty))
            .unwrap();
        assert_eq!(nanos, GenericValue::Integer(1_700_000_000_123_456_789));
        let millis = Converter::new(ConvertOptions::default().with_time_unit(TimeUnit::Milliseconds))
            .convert(&ts, Some(&ty))
            .unwrap();
        assert_eq!(millis, GenericValue::Integer(1_700_000_000_123));

        let tz = parse_type_spec("timestamp with local time zone").unwrap();
        assert_eq!(Converter::default().convert(&ts, Some(&tz)).unwrap(), micros);

        let date = prim(Scalar::Date { millis: 86_400_000 });
        assert_eq!(convert(&date, "date").unwrap(), GenericValue::Integer(86_400_000_000));

        let idt = prim(Scalar::IntervalDayTime { total_seconds: -90, nanos: -500_000_000 });
        assert_eq!(convert(&idt, "interval_day_time").unwrap(), GenericValue::Integer(-90_500_000));

        let iym = prim(Scalar::IntervalYearMonth { total_months: 14 });
        assert_eq!(convert(&iym, "interval_year_month").unwrap(), GenericValue::Integer(14));
    }

    #[test]
    fn timestamps_out_of_range_saturate() {
        let ts = prim(Scalar::Timestamp { seconds: i64::MAX, nanos: 0 });
        assert_eq!(convert(&ts, "timestamp").unwrap(), GenericValue::Integer(i64::MAX));
        let early = prim(Scalar::Date { millis: i64::MIN / 10 });
        assert_eq!(convert(&early, "date").unwrap(), GenericValue::Integer(i64::MIN));
    }

    #[test]
    fn void_and_unknown_are_unsupported() {
        for spec in ["void", "unknown"] {
            let err = convert(&prim(Scalar::Int(1)), spec).unwrap_err();
            assert!(matches!(err, ConvertError::UnsupportedPrimitive { .. }), "{spec}: {err}");
        }
        // null still short-circuits
        assert_eq!(convert(&Datum::Null, "void").unwrap(), GenericValue::Null);
    }

    #[test]
    fn list_preserves_order() {
        let xs = Datum::List(vec![prim(Scalar::Long(10)), prim(Scalar::Long(20)), prim(Scalar::Long(30))]);
        assert_eq!(
            convert(&xs, "array<bigint>").unwrap(),
            GenericValue::List(vec![GenericValue::Integer(10), GenericValue::Integer(20), GenericValue::Integer(30)])
        );
    }

    #[test]
    fn struct_becomes_field_map_regardless_of_order() {
        let row = Datum::Struct(vec![prim(Scalar::Int(1)), prim(Scalar::String("x".into()))]);
        let out = convert(&row, "struct<a:int,b:string>").unwrap();
        let map = out.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(out.get("a"), Some(&GenericValue::Integer(1)));
        assert_eq!(out.get("b"), Some(&GenericValue::text("x")));

        let swapped = Datum::Struct(vec![prim(Scalar::String("x".into())), prim(Scalar::Int(1))]);
        assert_eq!(convert(&swapped, "struct<b:string,a:int>").unwrap(), out);
    }

    #[test]
    fn missing_trailing_struct_fields_are_null() {
        let row = Datum::Struct(vec![prim(Scalar::Int(1))]);
        let out = convert(&row, "struct<a:int,b:string>").unwrap();
        assert_eq!(out.get("b"), Some(&GenericValue::Null));
    }

    #[test]
    fn union_converts_only_the_active_member() {
        let u = Datum::union(1, prim(Scalar::String("hello".into())));
        assert_eq!(convert(&u, "uniontype<int,string>").unwrap(), GenericValue::text("hello"));

        let bad_tag = Datum::union(2, prim(Scalar::Int(1)));
        let err = convert(&bad_tag, "uniontype<int,string>").unwrap_err();
        assert!(matches!(err, ConvertError::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn map_duplicate_keys_keep_the_last_value() {
        let m = Datum::Map(vec![
            (prim(Scalar::String("k".into())), prim(Scalar::Int(1))),
            (prim(Scalar::String("j".into())), prim(Scalar::Int(2))),
            (prim(Scalar::String("k".into())), prim(Scalar::Int(3))),
        ]);
        let out = convert(&m, "map<string,int>").unwrap();
        assert_eq!(out.as_map().unwrap().len(), 2);
        assert_eq!(out.get("k"), Some(&GenericValue::Integer(3)));
        assert_eq!(out.get("j"), Some(&GenericValue::Integer(2)));
    }

    #[test]
    fn null_propagates_at_every_level() {
        let row = Datum::Struct(vec![
            Datum::List(vec![prim(Scalar::Int(1)), Datum::Null]),
            Datum::Map(vec![(prim(Scalar::String("k".into())), Datum::Null)]),
            Datum::Null,
            Datum::union(0, Datum::Null),
        ]);
        let out = convert(&row, "struct<xs:array<int>,m:map<string,double>,s:struct<z:int>,u:uniontype<int>>").unwrap();
        assert_eq!(out.get("xs"), Some(&GenericValue::List(vec![GenericValue::Integer(1), GenericValue::Null])));
        assert_eq!(out.get("m").and_then(|m| m.get("k")), Some(&GenericValue::Null));
        assert_eq!(out.get("s"), Some(&GenericValue::Null));
        assert_eq!(out.get("u"), Some(&GenericValue::Null));
    }

    #[test]
    fn category_mismatch_is_fatal_and_names_the_path() {
        let row = Datum::Struct(vec![Datum::List(vec![prim(Scalar::Int(1)), Datum::Struct(vec![])])]);
        let err = convert(&row, "struct<xs:array<array<int>>>").unwrap_err();
        match err {
            ConvertError::TypeMismatch { path, expected, found } => {
                assert_eq!(path.to_string(), "$.xs[0]");
                assert_eq!(expected, "list");
                assert_eq!(found, "primitive");
            }
            other => panic!("unexpected {other:?}"),
        }

        let list_vs_struct = convert(&Datum::Struct(vec![]), "array<int>").unwrap_err();
        assert!(matches!(list_vs_struct, ConvertError::TypeMismatch { .. }));
    }

    #[test]
    fn scalar_of_the_wrong_subkind_is_a_mismatch() {
        let err = convert(&prim(Scalar::String("1".into())), "int").unwrap_err();
        assert_eq!(
            err,
            ConvertError::TypeMismatch { path: ValuePath::root(), expected: "int".into(), found: "string".into() }
        );
    }

    #[test]
    fn missing_descriptor_is_reported_unless_null() {
        let conv = Converter::default();
        assert_eq!(conv.convert(&prim(Scalar::Int(1)), None).unwrap_err(), ConvertError::MissingSchema);
        assert_eq!(conv.convert(&Datum::Null, None).unwrap(), GenericValue::Null);
    }

    #[test]
    fn depth_limit_stops_runaway_nesting() {
        let mut datum = prim(Scalar::Int(7));
        let mut spec = String::from("int");
        for _ in 0..5 {
            datum = Datum::List(vec![datum]);
            spec = format!("array<{spec}>");
        }
        let ty = parse_type_spec(&spec).unwrap();
        let shallow = Converter::new(ConvertOptions::default().with_max_depth(3));
        let err = shallow.convert(&datum, Some(&ty)).unwrap_err();
        assert!(matches!(err, ConvertError::DepthLimitExceeded { limit: 3, .. }), "{err}");
        assert!(Converter::new(ConvertOptions::default().with_max_depth(6)).convert(&datum, Some(&ty)).is_ok());
    }
}
