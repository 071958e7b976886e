//! Schema-driven conversion of typed ORC/Hive records into generic value trees.
//!
//! - [`type_spec`] — Hive type strings → [`TypeDescriptor`] trees
//! - [`cache`] — single-slot memo of the last resolved descriptor
//! - [`convert`] — descriptor-guided walk producing [`GenericValue`]s
//! - [`record`] — the call site tying the cache and the converter together
//! - [`load`] — JSON → [`Datum`] fixtures for the CLI and tests
pub mod cache;
pub mod config;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod load;
pub mod path_de;
pub mod record;
pub mod type_spec;
pub mod typed;
pub mod value;

pub use cache::{SharedDescriptorCache, TypeDescriptorCache};
pub use config::{ConvertOptions, TimeUnit};
pub use convert::Converter;
pub use descriptor::{Category, PrimitiveKind, TypeDescriptor};
pub use error::{ConvertError, SchemaError, ValuePath};
pub use record::RecordConverter;
pub use type_spec::{HiveTypeParser, TypeSpecParser};
pub use typed::{Datum, Decimal, Scalar, TypedValue};
pub use value::GenericValue;
