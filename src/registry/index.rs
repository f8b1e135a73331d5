//! Package-to-types index.
//!
//! Filled from package clauses during pass 1, before a file's types are
//! declared, so a wildcard import can see a type whether or not its file has
//! been committed yet. Sealed at the pass barrier.

use std::collections::BTreeMap;

use super::TypeId;

#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    /// package -> simple name -> id (once declared).
    packages: BTreeMap<String, BTreeMap<String, Option<TypeId>>>,
    sealed: bool,
}

impl PackageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `package` declares a type named `name`.
    pub fn add(&mut self, package: &str, name: &str) {
        if self.sealed {
            tracing::warn!("package index is sealed; ignoring {}.{}", package, name);
            return;
        }
        self.packages
            .entry(package.to_string())
            .or_default()
            .entry(name.to_string())
            .or_insert(None);
    }

    /// Attach the declared identity to an indexed name.
    pub fn bind(&mut self, package: &str, name: &str, id: TypeId) {
        if self.sealed {
            tracing::warn!("package index is sealed; ignoring {}.{}", package, name);
            return;
        }
        self.packages
            .entry(package.to_string())
            .or_default()
            .insert(name.to_string(), Some(id));
    }

    /// Whether `package` is known to declare `name`.
    pub fn contains(&self, package: &str, name: &str) -> bool {
        self.packages
            .get(package)
            .map(|types| types.contains_key(name))
            .unwrap_or(false)
    }

    /// Declared identity of `package.name`, if bound.
    pub fn lookup(&self, package: &str, name: &str) -> Option<TypeId> {
        self.packages.get(package)?.get(name).copied().flatten()
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Reopen for a new pass 1.
    pub fn unseal(&mut self) {
        self.sealed = false;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}
