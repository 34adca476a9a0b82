#![forbid(unsafe_code)]

//! Algorithm registry mapping URIs to factory functions.
//!
//! The registry is an explicit value owned by the embedding application and
//! passed by reference to whoever needs to resolve algorithms.  Lookups and
//! registrations may interleave across threads; each insertion happens under
//! the write lock, so a reader sees either no entry or a complete one.
//!
//! User registration never overwrites an existing URI.  The bootstrap
//! [`AlgorithmRegistry::register_defaults`] does: it is meant to run once,
//! before any user registration, and reseeds the built-in identifiers.

use crate::{C14nAlgorithm, C14nMode};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use stilla_core::Error;

/// Creates a fresh algorithm instance.
pub type AlgorithmFactory = Arc<dyn Fn() -> Box<dyn C14nAlgorithm> + Send + Sync>;

/// Central registry of canonicalization algorithms.
#[derive(Default)]
pub struct AlgorithmRegistry {
    factories: RwLock<HashMap<String, AlgorithmFactory>>,
}

impl AlgorithmRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the seven built-in algorithms.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_defaults();
        registry
    }

    /// Seed the built-in identifiers, replacing whatever is registered
    /// under them.
    pub fn register_defaults(&self) {
        let mut factories = self.write();
        for mode in C14nMode::ALL {
            let factory: AlgorithmFactory = Arc::new(move || mode.algorithm());
            factories.insert(mode.uri().to_owned(), factory);
        }
        tracing::debug!(count = C14nMode::ALL.len(), "registered default c14n algorithms");
    }

    /// Register `factory` under `uri`.
    ///
    /// Fails with [`Error::AlreadyRegistered`] if the URI is taken; the
    /// existing entry is left untouched.
    pub fn register(&self, uri: &str, factory: AlgorithmFactory) -> Result<(), Error> {
        match self.write().entry(uri.to_owned()) {
            Entry::Occupied(_) => Err(Error::AlreadyRegistered(uri.to_owned())),
            Entry::Vacant(slot) => {
                slot.insert(factory);
                tracing::debug!(uri, "registered c14n algorithm");
                Ok(())
            }
        }
    }

    /// Register a closure as the factory for `uri`.
    pub fn register_fn<F>(&self, uri: &str, factory: F) -> Result<(), Error>
    where
        F: Fn() -> Box<dyn C14nAlgorithm> + Send + Sync + 'static,
    {
        self.register(uri, Arc::new(factory))
    }

    /// Instantiate the algorithm registered under `uri`.
    pub fn lookup(&self, uri: &str) -> Result<Box<dyn C14nAlgorithm>, Error> {
        let factory = self
            .read()
            .get(uri)
            .cloned()
            .ok_or_else(|| Error::UnknownAlgorithm(uri.to_owned()))?;
        Ok(factory())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.read().contains_key(uri)
    }

    /// Registered URIs, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.read().keys().cloned().collect();
        uris.sort();
        uris
    }

    // A panic while holding the lock cannot leave a half-inserted entry, so
    // a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, AlgorithmFactory>> {
        self.factories.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, AlgorithmFactory>> {
        self.factories.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("uris", &self.uris())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExclusiveC14n, InclusiveC14n};
    use stilla_core::{algorithm, ErrorKind};

    #[test]
    fn test_defaults_cover_all_modes() {
        let registry = AlgorithmRegistry::with_defaults();
        assert_eq!(registry.uris().len(), 7);
        for mode in C14nMode::ALL {
            let algo = registry.lookup(mode.uri()).unwrap();
            assert_eq!(algo.uri(), mode.uri());
        }
    }

    #[test]
    fn test_unknown_uri() {
        let registry = AlgorithmRegistry::new();
        let err = registry.lookup(algorithm::C14N).err().unwrap();
        assert!(matches!(err, Error::UnknownAlgorithm(ref uri) if uri == algorithm::C14N));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = AlgorithmRegistry::with_defaults();
        let err = registry
            .register_fn(algorithm::C14N, || Box::new(ExclusiveC14n::new(false)))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered(_)));
        assert_eq!(registry.lookup(algorithm::C14N).unwrap().uri(), algorithm::C14N);
    }

    #[test]
    fn test_register_defaults_overwrites() {
        let registry = AlgorithmRegistry::new();
        registry
            .register_fn(algorithm::C14N, || Box::new(ExclusiveC14n::new(false)))
            .unwrap();
        registry.register_defaults();
        assert_eq!(registry.lookup(algorithm::C14N).unwrap().uri(), algorithm::C14N);
    }

    #[test]
    fn test_custom_uri() {
        let registry = AlgorithmRegistry::new();
        registry
            .register_fn("urn:example:c14n", || Box::new(InclusiveC14n::new(true)))
            .unwrap();
        assert!(registry.contains("urn:example:c14n"));
        assert!(registry.lookup("urn:example:c14n").unwrap().with_comments());
    }

    #[test]
    fn test_concurrent_lookup_and_register() {
        let registry = AlgorithmRegistry::with_defaults();
        std::thread::scope(|scope| {
            for i in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    let uri = format!("urn:example:c14n:{i}");
                    registry
                        .register_fn(&uri, || Box::new(InclusiveC14n::new(false)))
                        .unwrap();
                    for _ in 0..100 {
                        assert!(registry.lookup(algorithm::EXC_C14N).is_ok());
                    }
                });
            }
        });
        assert_eq!(registry.uris().len(), 11);
    }
}
