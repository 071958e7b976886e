//! Type descriptors: the parsed shape of an ORC/Hive record.
//!
//! A descriptor is immutable once built. The cache hands it out behind an `Arc`
//! so repeated calls with the same type string share a single tree.
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

// ------------------------------- Descriptor ------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum TypeDescriptor {
    Primitive { kind: PrimitiveKind },
    List { element: Box<TypeDescriptor> },
    Map { key: Box<TypeDescriptor>, value: Box<TypeDescriptor> },
    /// Declared field order is kept; names are unique.
    Struct { fields: IndexMap<String, TypeDescriptor> },
    Union { members: Vec<TypeDescriptor> },
}

/// Leaf scalar classification, one variant per Hive primitive category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    Char { length: u32 },
    Varchar { max_length: u32 },
    Decimal { precision: u8, scale: u8 },
    Date,
    Timestamp,
    TimestampLocalTz,
    Binary,
    IntervalYearMonth,
    IntervalDayTime,
    Void,
    Unknown,
}

/// Coarse category of a descriptor node or of a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Primitive,
    List,
    Map,
    Struct,
    Union,
}

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive { kind }
    }

    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List { element: Box::new(element) }
    }

    pub fn map(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Map { key: Box::new(key), value: Box::new(value) }
    }

    pub fn structure<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, TypeDescriptor)>,
        S: Into<String>,
    {
        TypeDescriptor::Struct {
            fields: fields.into_iter().map(|(name, ty)| (name.into(), ty)).collect(),
        }
    }

    pub fn union(members: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Union { members }
    }

    pub fn category(&self) -> Category {
        match self {
            TypeDescriptor::Primitive { .. } => Category::Primitive,
            TypeDescriptor::List { .. } => Category::List,
            TypeDescriptor::Map { .. } => Category::Map,
            TypeDescriptor::Struct { .. } => Category::Struct,
            TypeDescriptor::Union { .. } => Category::Union,
        }
    }

    /// Nesting depth of the tree; a lone primitive is depth 1.
    pub fn depth(&self) -> usize {
        match self {
            TypeDescriptor::Primitive { .. } => 1,
            TypeDescriptor::List { element } => 1 + element.depth(),
            TypeDescriptor::Map { key, value } => 1 + key.depth().max(value.depth()),
            TypeDescriptor::Struct { fields } => {
                1 + fields.values().map(TypeDescriptor::depth).max().unwrap_or(0)
            }
            TypeDescriptor::Union { members } => {
                1 + members.iter().map(TypeDescriptor::depth).max().unwrap_or(0)
            }
        }
    }
}

impl PrimitiveKind {
    /// Hive type name, qualifiers included (`decimal(10,2)`, `char(1)`).
    pub fn type_name(&self) -> String {
        match self {
            PrimitiveKind::Char { length } => format!("char({length})"),
            PrimitiveKind::Varchar { max_length } => format!("varchar({max_length})"),
            PrimitiveKind::Decimal { precision, scale } => format!("decimal({precision},{scale})"),
            other => other.base_name().to_string(),
        }
    }

    fn base_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "tinyint",
            PrimitiveKind::Short => "smallint",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "bigint",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::String => "string",
            PrimitiveKind::Char { .. } => "char",
            PrimitiveKind::Varchar { .. } => "varchar",
            PrimitiveKind::Decimal { .. } => "decimal",
            PrimitiveKind::Date => "date",
            PrimitiveKind::Timestamp => "timestamp",
            PrimitiveKind::TimestampLocalTz => "timestamp with local time zone",
            PrimitiveKind::Binary => "binary",
            PrimitiveKind::IntervalYearMonth => "interval_year_month",
            PrimitiveKind::IntervalDayTime => "interval_day_time",
            PrimitiveKind::Void => "void",
            PrimitiveKind::Unknown => "unknown",
        }
    }
}

// ------------------------------- Display ---------------------------------- //

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Primitive => "primitive",
            Category::List => "list",
            Category::Map => "map",
            Category::Struct => "struct",
            Category::Union => "union",
        };
        f.write_str(s)
    }
}

/// Renders the canonical Hive type string, e.g. `struct<a:int,b:array<string>>`.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive { kind } => write!(f, "{kind}"),
            TypeDescriptor::List { element } => write!(f, "array<{element}>"),
            TypeDescriptor::Map { key, value } => write!(f, "map<{key},{value}>"),
            TypeDescriptor::Struct { fields } => {
                f.write_str("struct<")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}:{ty}")?;
                }
                f.write_str(">")
            }
            TypeDescriptor::Union { members } => {
                f.write_str("uniontype<")?;
                for (i, ty) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(">")
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_canonical_type_string() {
        let ty = TypeDescriptor::structure([
            ("a", TypeDescriptor::primitive(PrimitiveKind::Int)),
            ("b", TypeDescriptor::list(TypeDescriptor::primitive(PrimitiveKind::String))),
            (
                "c",
                TypeDescriptor::map(
                    TypeDescriptor::primitive(PrimitiveKind::String),
                    TypeDescriptor::primitive(PrimitiveKind::Decimal { precision: 10, scale: 2 }),
                ),
            ),
            (
                "d",
                TypeDescriptor::union(vec![
                    TypeDescriptor::primitive(PrimitiveKind::Int),
                    TypeDescriptor::primitive(PrimitiveKind::Char { length: 1 }),
                ]),
            ),
        ]);
        assert_eq!(
            ty.to_string(),
            "struct<a:int,b:array<string>,c:map<string,decimal(10,2)>,d:uniontype<int,char(1)>>"
        );
    }

    #[test]
    fn depth_counts_nesting_levels() {
        let leaf = TypeDescriptor::primitive(PrimitiveKind::Long);
        assert_eq!(leaf.depth(), 1);
        let nested = TypeDescriptor::structure([("xs", TypeDescriptor::list(leaf.clone()))]);
        assert_eq!(nested.depth(), 3);
        assert_eq!(nested.category(), Category::Struct);
    }

    #[test]
    fn serializes_with_category_tag() {
        let ty = TypeDescriptor::list(TypeDescriptor::primitive(PrimitiveKind::Varchar { max_length: 20 }));
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["category"], "list");
        assert_eq!(json["element"]["kind"]["name"], "varchar");
        assert_eq!(json["element"]["kind"]["max_length"], 20);
    }
}
