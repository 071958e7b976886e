use std::fmt;

use crate::descriptor::PrimitiveKind;

/// A type string that failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type spec `{spec}` at offset {offset}: {message}")]
pub struct SchemaError {
    pub spec: String,
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("no type descriptor supplied and none cached from a previous call")]
    MissingSchema,
    #[error("type mismatch at {path}: descriptor expects {expected}, value is {found}")]
    TypeMismatch {
        path: ValuePath,
        expected: String,
        found: String,
    },
    #[error("unsupported primitive type `{kind}` at {path}")]
    UnsupportedPrimitive { path: ValuePath, kind: PrimitiveKind },
    #[error("nesting deeper than {limit} levels at {path}")]
    DepthLimitExceeded { path: ValuePath, limit: usize },
}

// ------------------------------- Value path ------------------------------- //

/// Location inside a record, rendered as `$.field[3]{key}<tag 1>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValuePath(Vec<PathSegment>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
    /// Key of the n-th map entry.
    MapKey(usize),
    /// Value of the n-th map entry.
    MapValue(usize),
    Tag(usize),
}

impl ValuePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::MapKey(i) => write!(f, "{{key #{i}}}")?,
                PathSegment::MapValue(i) => write!(f, "{{value #{i}}}")?,
                PathSegment::Tag(t) => write!(f, "<tag {t}>")?,
            }
        }
        Ok(())
    }
}
