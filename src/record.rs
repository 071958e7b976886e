//! The call site: optional spec text plus a mandatory record in, generic value out.
use std::sync::Arc;

use crate::cache::TypeDescriptorCache;
use crate::config::ConvertOptions;
use crate::convert::Converter;
use crate::descriptor::{Category, TypeDescriptor};
use crate::error::{ConvertError, ValuePath};
use crate::type_spec::{HiveTypeParser, TypeSpecParser};
use crate::typed::TypedValue;
use crate::value::GenericValue;

/// One per execution context: owns its descriptor cache, so two instances
/// never share the cached slot.
#[derive(Debug, Clone, Default)]
pub struct RecordConverter<P = HiveTypeParser> {
    parser: P,
    cache: TypeDescriptorCache,
    converter: Converter,
}

impl RecordConverter<HiveTypeParser> {
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_parser(HiveTypeParser, options)
    }
}

impl<P: TypeSpecParser> RecordConverter<P> {
    pub fn with_parser(parser: P, options: ConvertOptions) -> Self {
        Self { parser, cache: TypeDescriptorCache::new(), converter: Converter::new(options) }
    }

    pub fn cache(&self) -> &TypeDescriptorCache {
        &self.cache
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Descriptor for `spec`, or the remembered one when `spec` is absent.
    pub fn resolve(&mut self, spec: Option<&str>) -> Result<Arc<TypeDescriptor>, ConvertError> {
        self.cache.resolve(spec, &self.parser)?.ok_or(ConvertError::MissingSchema)
    }

    /// Converts `record`, a struct, under `spec`. Without `spec` the descriptor
    /// from the previous call is reused; with neither, the call fails with
    /// [`ConvertError::MissingSchema`].
    pub fn convert_record<V>(&mut self, spec: Option<&str>, record: &V) -> Result<GenericValue, ConvertError>
    where
        V: TypedValue + ?Sized,
    {
        let descriptor = self.resolve(spec)?;
        match record.category() {
            Some(Category::Struct) => {}
            found => {
                return Err(ConvertError::TypeMismatch {
                    path: ValuePath::root(),
                    expected: "struct record".into(),
                    found: found.map_or_else(|| "null".to_string(), |c| c.to_string()),
                });
            }
        }
        tracing::trace!(descriptor = %descriptor, "converting record");
        self.converter.convert(record, Some(descriptor.as_ref()))
    }
}
