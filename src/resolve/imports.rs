//! Name-to-type resolution through a type's imports.
//!
//! Precedence, first match wins:
//! 1. `this` / `self` -> the referencing type
//! 2. `super` -> its superclass
//! 3. an exact, non-static import ending in `.Name`
//! 4. a non-static wildcard import whose package declares `Name`
//! 5. `Name` in the referencing type's own package
//! 6. the built-in allow-list

use std::collections::HashSet;

use serde::Serialize;

use crate::config::Config;
use crate::registry::{qualify, Registry, TypeId};

/// Built-in type names resolvable without an import.
#[derive(Debug, Clone)]
pub struct Builtins {
    package: String,
    names: HashSet<String>,
}

impl Builtins {
    pub fn new<I, S>(package: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            package: package.to_string(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.builtin_package, config.builtin_types.iter().cloned())
    }

    /// Fully-qualified name of a built-in, if `name` is one.
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.names
            .contains(name)
            .then(|| qualify(Some(&self.package), name))
    }
}

impl Default for Builtins {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A resolved type name: always a fully-qualified name, plus the identity
/// when the type is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedName {
    pub fqn: String,
    pub id: Option<TypeId>,
}

impl ResolvedName {
    fn registered(registry: &Registry, id: TypeId) -> Self {
        Self {
            fqn: registry.type_record(id).qualified_name(),
            id: Some(id),
        }
    }
}

/// Resolves names in the context of a referencing type.
pub struct ImportResolver<'r> {
    registry: &'r Registry,
    builtins: &'r Builtins,
}

impl<'r> ImportResolver<'r> {
    pub fn new(registry: &'r Registry, builtins: &'r Builtins) -> Self {
        Self { registry, builtins }
    }

    /// Resolve `name` as seen from `context`, applying every rule.
    pub fn resolve(&self, name: &str, context: TypeId) -> Option<ResolvedName> {
        match name {
            "this" | "self" => Some(ResolvedName::registered(self.registry, context)),
            "super" => match self.registry.superclass_of(context) {
                Some(superclass) => Some(ResolvedName::registered(self.registry, superclass)),
                // Unregistered superclass: resolve its written name instead.
                None => self
                    .registry
                    .type_record(context)
                    .superclass
                    .as_deref()
                    .and_then(|written| self.resolve_type_name(written, context)),
            },
            _ => self.resolve_type_name(name, context),
        }
    }

    /// Resolve `name` as a type name (rules 3-6). Dotted names that are
    /// registered fully-qualified types resolve directly, as do nested type
    /// names such as `Outer.Inner` or `pkg.Outer.Inner`.
    pub fn resolve_type_name(&self, name: &str, context: TypeId) -> Option<ResolvedName> {
        if name.contains('.') {
            if let Some(id) = self.registry.lookup_qualified(name) {
                return Some(ResolvedName::registered(self.registry, id));
            }
            if let Some(id) = self.resolve_nested(name, context) {
                return Some(ResolvedName::registered(self.registry, id));
            }
            if looks_qualified(name) {
                return Some(ResolvedName {
                    fqn: name.to_string(),
                    id: None,
                });
            }
        }

        // Rule 3: explicit single-type import.
        if let Some(import) = self
            .registry
            .imports_of(context)
            .find(|i| !i.is_static && i.names(name))
        {
            return Some(ResolvedName {
                fqn: import.path.clone(),
                id: self.registry.lookup_qualified(&import.path),
            });
        }

        // Rule 4: wildcard import, package index first.
        let index = self.registry.package_index();
        for import in self
            .registry
            .imports_of(context)
            .filter(|i| i.is_wildcard && !i.is_static)
        {
            let package = import.path.as_str();
            let id = self.registry.lookup_type(name, Some(package));
            if id.is_some() || index.contains(package, name) {
                return Some(ResolvedName {
                    fqn: qualify(Some(package), name),
                    id,
                });
            }
        }

        // Rule 5: same package.
        let package = self.registry.type_record(context).package.as_deref();
        if let Some(id) = self.registry.lookup_type(name, package) {
            return Some(ResolvedName::registered(self.registry, id));
        }

        // Rule 6: built-ins.
        self.builtins.resolve(name).map(|fqn| ResolvedName {
            id: self.registry.lookup_qualified(&fqn),
            fqn,
        })
    }

    /// Nested types are registered by simple name in their file's package.
    /// Find the package of the outermost type segment (resolved in `context`
    /// when unqualified) and look the innermost name up there.
    fn resolve_nested(&self, name: &str, context: TypeId) -> Option<TypeId> {
        let segments: Vec<&str> = name.split('.').collect();
        let outer_at = segments.iter().position(|s| s.starts_with(char::is_uppercase))?;
        let inner = segments[segments.len() - 1];
        if outer_at + 1 >= segments.len() || !inner.starts_with(char::is_uppercase) {
            return None;
        }
        let package = if outer_at == 0 {
            let outer = self.resolve_type_name(segments[0], context)?.id?;
            self.registry.type_record(outer).package.clone()
        } else {
            Some(segments[..outer_at].join("."))
        };
        self.registry.lookup_type(inner, package.as_deref())
    }
}

/// `pkg.sub.Type`: a lowercase leading segment and a capitalized last one.
fn looks_qualified(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    let starts_with = |s: &str, f: fn(char) -> bool| s.chars().next().map(f).unwrap_or(false);
    segments.len() > 1
        && segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
        && starts_with(segments[0], char::is_lowercase)
        && starts_with(segments[segments.len() - 1], char::is_uppercase)
}
