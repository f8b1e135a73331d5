//! Call-site resolution.
//!
//! Combines the [`ImportResolver`] (qualifier -> target type) and the
//! [`OverloadResolver`] (target type + argument types -> member). All
//! resolution reads a finished registry and never mutates it.

mod imports;
mod overload;
pub mod tables;

pub use imports::{Builtins, ImportResolver, ResolvedName};
pub use overload::OverloadResolver;

use crate::analysis::{format_signature, simple_type_name, CallKind, CallSite, ExprDescriptor, LiteralKind};
use crate::config::Config;
use crate::registry::{qualify, MemberId, Registry, TypeId};

/// Resolution settings.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub builtins: Builtins,
    /// Type unresolved receivers from the receiver expression.
    pub receiver_inference: bool,
}

impl ResolveOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            builtins: Builtins::from_config(config),
            receiver_inference: config.receiver_inference,
        }
    }
}

/// Outcome of resolving one call site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallResolution {
    /// Target type, when the qualifier (or implicit receiver) resolved.
    pub target_type: Option<ResolvedName>,
    /// Selected member, when one matched.
    pub member: Option<MemberId>,
    /// Called name with the inferred argument types.
    pub signature_hint: Option<String>,
}

/// Link every type's superclass and interfaces through the import rules.
/// Call at the pass-1 barrier, and after loading a registry.
pub fn link_hierarchy(registry: &mut Registry, options: &ResolveOptions) {
    let builtins = &options.builtins;
    registry.link_hierarchy(|reg, owner, name| {
        ImportResolver::new(reg, builtins)
            .resolve_type_name(name, owner)
            .and_then(|resolved| resolved.id)
    });
}

/// Resolves call sites against a sealed registry.
pub struct CallResolver<'r> {
    registry: &'r Registry,
    imports: ImportResolver<'r>,
    overloads: OverloadResolver<'r>,
    options: &'r ResolveOptions,
}

impl<'r> CallResolver<'r> {
    pub fn new(registry: &'r Registry, options: &'r ResolveOptions) -> Self {
        Self {
            registry,
            imports: ImportResolver::new(registry, &options.builtins),
            overloads: OverloadResolver::new(registry),
            options,
        }
    }

    /// Resolve a call site found in a member of `caller_type`.
    pub fn resolve_call(&self, caller_type: TypeId, site: &CallSite) -> CallResolution {
        let args: Vec<String> = site
            .args
            .iter()
            .map(|arg| self.arg_type(caller_type, arg))
            .collect();
        let signature_hint = match site.kind {
            CallKind::Reference => None,
            _ => Some(format_signature(&site.name, &args)),
        };

        let (target_type, member) = match (site.kind, site.qualifier.as_deref()) {
            (CallKind::Invocation, None) => self.unqualified(caller_type, &site.name, &args),
            (CallKind::Invocation, Some(_)) => {
                let target = self.qualifier_type(caller_type, site);
                let member = target
                    .as_ref()
                    .and_then(|t| t.id)
                    .and_then(|t| self.overloads.select_method(t, &site.name, &args));
                (target, member)
            }
            (CallKind::Construction, qualifier) => {
                let target = qualifier.and_then(|q| self.imports.resolve(q, caller_type));
                let member = target
                    .as_ref()
                    .and_then(|t| t.id)
                    .and_then(|t| self.overloads.select_constructor(t, &args));
                (target, member)
            }
            (CallKind::Reference, _) => {
                let target = self.qualifier_type(caller_type, site);
                let member = target
                    .as_ref()
                    .and_then(|t| t.id)
                    .and_then(|t| self.overloads.select_reference(t, &site.name));
                (target, member)
            }
        };

        CallResolution {
            target_type,
            member,
            signature_hint,
        }
    }

    /// An unqualified call: the caller's own type (inherited members
    /// included), then an exact static import of the name, then each static
    /// wildcard import in order.
    fn unqualified(
        &self,
        caller_type: TypeId,
        name: &str,
        args: &[String],
    ) -> (Option<ResolvedName>, Option<MemberId>) {
        let own = self.imports.resolve("this", caller_type);
        if let Some(member) = self.overloads.select_method(caller_type, name, args) {
            return (own, Some(member));
        }

        let imports: Vec<_> = self
            .registry
            .imports_of(caller_type)
            .filter(|i| i.is_static)
            .collect();

        if let Some(import) = imports.iter().find(|i| i.names(name)) {
            if let Some((type_path, _)) = import.path.rsplit_once('.') {
                let id = self.registry.lookup_qualified(type_path);
                let member = id.and_then(|t| self.overloads.select_method(t, name, args));
                let target = ResolvedName {
                    fqn: type_path.to_string(),
                    id,
                };
                return (Some(target), member);
            }
        }

        for import in imports.iter().filter(|i| i.is_wildcard) {
            let Some(id) = self.registry.lookup_qualified(&import.path) else {
                continue;
            };
            if self.registry.find_members(id, name, true).is_empty() {
                continue;
            }
            let member = self.overloads.select_method(id, name, args);
            let target = ResolvedName {
                fqn: import.path.clone(),
                id: Some(id),
            };
            return (Some(target), member);
        }

        (own, None)
    }

    /// Target type of a qualified call: `this`/`super`, then the qualifier as
    /// a type name, then as a field (up the superclass chain), then, if
    /// enabled, the static type of the receiver expression.
    fn qualifier_type(&self, caller_type: TypeId, site: &CallSite) -> Option<ResolvedName> {
        let qualifier = site.qualifier.as_deref()?.trim();
        if matches!(qualifier, "this" | "self" | "super") {
            return self.imports.resolve(qualifier, caller_type);
        }

        let field_name = match qualifier.strip_prefix("this.") {
            Some(field) => field,
            None => {
                if let Some(resolved) = self.imports.resolve_type_name(qualifier, caller_type) {
                    return Some(resolved);
                }
                qualifier
            }
        };

        if let Some(field) = self.registry.find_field(caller_type, field_name) {
            if let Some(resolved) = self.imports.resolve_type_name(&field.type_name, field.owner) {
                return Some(resolved);
            }
        }

        if !self.options.receiver_inference {
            return None;
        }
        let receiver = site.receiver.as_deref()?;
        let ty = self.expr_type(caller_type, receiver)?;
        let base = ty.trim_end_matches("[]");
        if base.len() != ty.len() {
            return None;
        }
        tracing::trace!("inferred receiver {} for {}", ty, qualifier);
        self.imports.resolve_type_name(&ty, caller_type)
    }

    /// Simple static type of an argument, `Object` when unknown.
    fn arg_type(&self, caller_type: TypeId, arg: &ExprDescriptor) -> String {
        self.expr_type(caller_type, arg)
            .map(|t| simple_type_name(&t))
            .unwrap_or_else(|| tables::TOP_TYPE.to_string())
    }

    /// Static type of an expression as written (package qualifier kept when
    /// the source had one), or `None` when it cannot be determined.
    fn expr_type(&self, caller_type: TypeId, expr: &ExprDescriptor) -> Option<String> {
        match expr {
            ExprDescriptor::Typed(ty) => Some(ty.clone()),
            ExprDescriptor::Call(site) => {
                let member = self.resolve_call(caller_type, site).member?;
                Some(self.registry.member(member).return_type.clone())
            }
            ExprDescriptor::Literal(kind) => Some(literal_type(*kind).to_string()),
            ExprDescriptor::Name(name) if name == "this" => {
                let record = self.registry.type_record(caller_type);
                Some(qualify(record.package.as_deref(), &record.name))
            }
            ExprDescriptor::Name(name) => self
                .registry
                .find_field(caller_type, name)
                .map(|f| f.type_name.clone()),
            ExprDescriptor::Other => None,
        }
    }
}

fn literal_type(kind: LiteralKind) -> &'static str {
    match kind {
        LiteralKind::String => "String",
        LiteralKind::Char => "char",
        LiteralKind::Int => "int",
        LiteralKind::Long => "long",
        LiteralKind::Float => "float",
        LiteralKind::Double => "double",
        LiteralKind::Boolean => "boolean",
        LiteralKind::Null => tables::TOP_TYPE,
    }
}
