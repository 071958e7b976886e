//! Single-slot memo of the last resolved type descriptor.
use std::sync::{Arc, Mutex, PoisonError};

use crate::descriptor::TypeDescriptor;
use crate::error::ConvertError;
use crate::type_spec::TypeSpecParser;

/// The remembered spec text together with the tree it produced.
#[derive(Debug, Clone)]
struct CachedDescriptor {
    spec: String,
    descriptor: Arc<TypeDescriptor>,
}

/// Owned by one execution context. Holds at most one entry; a new spec text
/// replaces it whole.
#[derive(Debug, Clone, Default)]
pub struct TypeDescriptorCache {
    slot: Option<CachedDescriptor>,
}

impl TypeDescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `spec` to a descriptor, parsing only when it differs from the
    /// remembered text. With no `spec`, returns whatever was remembered last.
    pub fn resolve<P>(&mut self, spec: Option<&str>, parser: &P) -> Result<Option<Arc<TypeDescriptor>>, ConvertError>
    where
        P: TypeSpecParser + ?Sized,
    {
        let Some(spec) = spec else {
            return Ok(self.current());
        };
        if let Some(cached) = &self.slot {
            if cached.spec == spec {
                tracing::debug!(spec, "type descriptor cache hit");
                return Ok(Some(Arc::clone(&cached.descriptor)));
            }
        }
        tracing::debug!(spec, "type descriptor cache miss, parsing");
        let descriptor = Arc::new(parser.parse(spec)?);
        self.slot = Some(CachedDescriptor { spec: spec.to_string(), descriptor: Arc::clone(&descriptor) });
        Ok(Some(descriptor))
    }

    pub fn current(&self) -> Option<Arc<TypeDescriptor>> {
        self.slot.as_ref().map(|c| Arc::clone(&c.descriptor))
    }

    pub fn current_spec(&self) -> Option<&str> {
        self.slot.as_ref().map(|c| c.spec.as_str())
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

/// A cache shared between threads. Lookup, parse and replacement happen under
/// one lock so the spec text and its descriptor are never observed apart.
#[derive(Debug, Default)]
pub struct SharedDescriptorCache {
    inner: Mutex<TypeDescriptorCache>,
}

impl SharedDescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<P>(&self, spec: Option<&str>, parser: &P) -> Result<Option<Arc<TypeDescriptor>>, ConvertError>
    where
        P: TypeSpecParser + ?Sized,
    {
        // the slot is replaced in one assignment, so a poisoned lock still holds a consistent pair
        let mut cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        cache.resolve(spec, parser)
    }

    /// Snapshot of the remembered pair.
    pub fn snapshot(&self) -> Option<(String, Arc<TypeDescriptor>)> {
        let cache = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        cache.slot.as_ref().map(|c| (c.spec.clone(), Arc::clone(&c.descriptor)))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::type_spec::HiveTypeParser;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to the Hive parser and counts calls.
    #[derive(Default)]
    struct CountingParser {
        calls: AtomicUsize,
    }

    impl TypeSpecParser for CountingParser {
        fn parse(&self, spec: &str) -> Result<TypeDescriptor, SchemaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            HiveTypeParser.parse(spec)
        }
    }

    impl CountingParser {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn same_spec_twice_parses_once() {
        let parser = CountingParser::default();
        let mut cache = TypeDescriptorCache::new();
        let a = cache.resolve(Some("struct<a:int>"), &parser).unwrap().unwrap();
        let b = cache.resolve(Some("struct<a:int>"), &parser).unwrap().unwrap();
        assert_eq!(parser.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_specs_parse_twice_and_replace_the_slot() {
        let parser = CountingParser::default();
        let mut cache = TypeDescriptorCache::new();
        let a = cache.resolve(Some("struct<a:int>"), &parser).unwrap().unwrap();
        let b = cache.resolve(Some("struct<b:string>"), &parser).unwrap().unwrap();
        assert_eq!(parser.calls(), 2);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.current_spec(), Some("struct<b:string>"));

        // switching back is a miss again: the cache holds one entry only
        cache.resolve(Some("struct<a:int>"), &parser).unwrap();
        assert_eq!(parser.calls(), 3);
    }

    #[test]
    fn absent_spec_returns_remembered_descriptor() {
        let parser = CountingParser::default();
        let mut cache = TypeDescriptorCache::new();
        assert!(cache.resolve(None, &parser).unwrap().is_none());

        let a = cache.resolve(Some("array<int>"), &parser).unwrap().unwrap();
        let b = cache.resolve(None, &parser).unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(parser.calls(), 1);

        cache.clear();
        assert!(cache.resolve(None, &parser).unwrap().is_none());
    }

    #[test]
    fn parse_failure_leaves_slot_untouched() {
        let parser = CountingParser::default();
        let mut cache = TypeDescriptorCache::new();
        cache.resolve(Some("array<int>"), &parser).unwrap();
        let err = cache.resolve(Some("array<"), &parser).unwrap_err();
        assert!(matches!(err, ConvertError::Schema(_)));
        assert_eq!(cache.current_spec(), Some("array<int>"));
    }

    #[test]
    fn shared_cache_keeps_text_and_descriptor_paired() {
        let parser = CountingParser::default();
        let cache = SharedDescriptorCache::new();
        let specs = ["struct<a:int>", "array<string>", "map<string,bigint>"];
        std::thread::scope(|scope| {
            for t in 0..4 {
                let (cache, parser) = (&cache, &parser);
                scope.spawn(move || {
                    for i in 0..50 {
                        let spec = specs[(t + i) % specs.len()];
                        let ty = cache.resolve(Some(spec), parser).unwrap().unwrap();
                        assert_eq!(ty.to_string(), spec);
                        if let Some((text, descriptor)) = cache.snapshot() {
                            assert_eq!(descriptor.to_string(), text);
                        }
                    }
                });
            }
        });
        assert!(parser.calls() >= specs.len());
    }
}
