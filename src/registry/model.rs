//! Declaration model: ids and records.
//!
//! Records live in flat arenas owned by the [`Registry`](super::Registry) and
//! refer to each other only through ids, so cyclic inheritance or repeated
//! declarations never produce shared mutable state.

use std::fmt;

use serde::Serialize;

use crate::analysis::{CallContext, CallKind, LineSpan, MemberKind, CONSTRUCTOR_NAME, STATIC_INIT_NAME};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Position in the owning arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Persisted row id (arena index + 1).
            pub fn db_id(self) -> i64 {
                self.0 as i64 + 1
            }

            /// Inverse of [`db_id`](Self::db_id).
            pub fn from_db_id(id: i64) -> Option<Self> {
                u32::try_from(id.checked_sub(1)?).ok().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.db_id())
            }
        }
    };
}

arena_id!(
    /// Identity of a declared type.
    TypeId
);
arena_id!(
    /// Identity of a declared member.
    MemberId
);
arena_id!(FieldId);
arena_id!(ImportId);
arena_id!(
    /// Identity of a recorded call edge.
    EdgeId
);

/// A declared class, interface, enum or record.
#[derive(Debug, Clone, Serialize)]
pub struct TypeRecord {
    pub id: TypeId,
    pub name: String,
    pub package: Option<String>,
    /// Declaring file, relative to the analyzed root.
    pub location: String,
    pub is_interface: bool,
    pub is_abstract: bool,
    /// Superclass name as written (generics stripped).
    pub superclass: Option<String>,
    /// Implemented (or, for interfaces, extended) names as written.
    pub interfaces: Vec<String>,
}

impl TypeRecord {
    /// `package.Name`, or `Name` in the default package.
    pub fn qualified_name(&self) -> String {
        qualify(self.package.as_deref(), &self.name)
    }
}

/// Join a package and a simple name.
pub fn qualify(package: Option<&str>, name: &str) -> String {
    match package {
        Some(p) if !p.is_empty() => format!("{}.{}", p, name),
        _ => name.to_string(),
    }
}

/// A declared method, constructor or static initializer.
#[derive(Debug, Clone, Serialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub owner: TypeId,
    pub name: String,
    /// Normalized `name(T1,T2)`.
    pub signature: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub is_static: bool,
    pub is_public: bool,
    pub span: LineSpan,
}

impl MemberRecord {
    pub fn kind(&self) -> MemberKind {
        match self.name.as_str() {
            CONSTRUCTOR_NAME => MemberKind::Constructor,
            STATIC_INIT_NAME => MemberKind::Initializer,
            _ => MemberKind::Method,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind() == MemberKind::Constructor
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldRecord {
    pub id: FieldId,
    pub owner: TypeId,
    pub name: String,
    pub type_name: String,
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRecord {
    pub id: ImportId,
    pub owner: TypeId,
    pub path: String,
    pub is_wildcard: bool,
    pub is_static: bool,
}

impl ImportRecord {
    /// Whether this is a single-type or single-member import of `name`.
    pub fn names(&self, name: &str) -> bool {
        !self.is_wildcard
            && self
                .path
                .rsplit_once('.')
                .map(|(_, last)| last == name)
                .unwrap_or(self.path == name)
    }
}

/// One observed call-like expression.
#[derive(Debug, Clone, Serialize)]
pub struct CallEdge {
    pub id: EdgeId,
    pub caller: MemberId,
    /// Position of the call site in the caller's walk order.
    pub ordinal: u32,
    pub kind: CallKind,
    /// Raw qualifier text, absent for unqualified calls.
    pub called_type_hint: Option<String>,
    pub called_name: String,
    /// Called name plus inferred argument types, e.g. `helper(int,String)`.
    pub called_signature_hint: Option<String>,
    pub line: u32,
    /// Set at most once.
    pub resolved: Option<MemberId>,
    /// Fully-qualified target type, when the qualifier resolved.
    pub resolved_type: Option<String>,
    pub context: CallContext,
}

impl CallEdge {
    /// Whether the edge already carries exactly this call-site content.
    pub(crate) fn matches(&self, spec: &EdgeSpec) -> bool {
        self.kind == spec.kind
            && self.called_type_hint == spec.called_type_hint
            && self.called_name == spec.called_name
            && self.called_signature_hint == spec.called_signature_hint
            && self.line == spec.line
            && self.context == spec.context
    }
}

/// Input for [`Registry::declare_type`](super::Registry::declare_type).
#[derive(Debug, Clone, Default)]
pub struct TypeSpec {
    pub name: String,
    pub package: Option<String>,
    pub location: String,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
}

/// Input for [`Registry::declare_member`](super::Registry::declare_member).
#[derive(Debug, Clone, Default)]
pub struct MemberSpec {
    pub name: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub is_static: bool,
    pub is_public: bool,
    pub span: LineSpan,
}

/// Input for [`Registry::record_call`](super::Registry::record_call).
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub kind: CallKind,
    pub called_type_hint: Option<String>,
    pub called_name: String,
    pub called_signature_hint: Option<String>,
    pub line: u32,
    pub context: CallContext,
}

/// Counts over the registry contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub types: usize,
    pub members: usize,
    pub fields: usize,
    pub imports: usize,
    pub edges: usize,
    pub resolved_edges: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_id_roundtrip() {
        let id = MemberId(0);
        assert_eq!(id.db_id(), 1);
        assert_eq!(MemberId::from_db_id(1), Some(id));
        assert_eq!(MemberId::from_db_id(0), None);
    }

    #[test]
    fn test_out_of_range_db_ids() {
        assert_eq!(EdgeId::from_db_id(i64::MIN), None);
        assert_eq!(EdgeId::from_db_id(-1), None);
        assert_eq!(EdgeId::from_db_id(i64::MAX), None);
        assert_eq!(EdgeId::from_db_id(u32::MAX as i64 + 1), Some(EdgeId(u32::MAX)));
    }

    #[test]
    fn test_import_names() {
        let import = ImportRecord {
            id: ImportId(0),
            owner: TypeId(0),
            path: "com.example.Util.helper".to_string(),
            is_wildcard: false,
            is_static: true,
        };
        assert!(import.names("helper"));
        assert!(!import.names("Util"));
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify(Some("a.b"), "C"), "a.b.C");
        assert_eq!(qualify(None, "C"), "C");
        assert_eq!(qualify(Some(""), "C"), "C");
    }
}
