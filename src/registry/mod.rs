//! Registry of declarations and call edges.
//!
//! The registry is the single owner of every type, member, field, import and
//! call edge. All creation goes through idempotent `declare_*` / `record_call`
//! operations keyed by natural keys; every other component holds ids only.
//!
//! Callers must finish all declarations for the whole file set (pass 1)
//! before issuing resolution queries. The registry does not enforce this
//! beyond sealing the package index at the barrier.

mod index;
mod model;

use std::collections::{HashMap, HashSet};

pub use index::PackageIndex;
pub use model::{
    qualify, CallEdge, EdgeId, EdgeSpec, FieldId, FieldRecord, ImportId, ImportRecord, MemberId,
    MemberRecord, MemberSpec, RegistryStats, TypeId, TypeRecord, TypeSpec,
};

use crate::analysis::format_signature;

/// Resolved inheritance links of one type.
#[derive(Debug, Clone, Default)]
struct Links {
    superclass: Option<TypeId>,
    interfaces: Vec<TypeId>,
}

/// Flat-arena declaration store.
#[derive(Debug, Default)]
pub struct Registry {
    types: Vec<TypeRecord>,
    members: Vec<MemberRecord>,
    fields: Vec<FieldRecord>,
    imports: Vec<ImportRecord>,
    edges: Vec<CallEdge>,

    type_keys: HashMap<(String, Option<String>), TypeId>,
    member_keys: HashMap<(TypeId, String), MemberId>,
    field_keys: HashMap<(TypeId, String), FieldId>,
    import_keys: HashMap<(TypeId, String, bool, bool), ImportId>,
    edge_keys: HashMap<(MemberId, u32), EdgeId>,

    // Derived indexes, rebuilt from the arenas on load.
    members_by_type: Vec<Vec<MemberId>>,
    imports_by_type: Vec<Vec<ImportId>>,
    edges_by_caller: HashMap<MemberId, Vec<EdgeId>>,
    callers: HashMap<MemberId, Vec<EdgeId>>,
    by_simple_name: HashMap<String, Vec<TypeId>>,
    packages: PackageIndex,
    links: Vec<Links>,
}

fn package_key(package: Option<&str>) -> Option<String> {
    package.filter(|p| !p.is_empty()).map(|p| p.to_string())
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything (caller-level reset before a fresh pass 1).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Reopen a sealed registry for another pass 1 on top of its contents.
    pub fn begin_declarations(&mut self) {
        self.packages.unseal();
    }

    /// Close pass 1: no more package-index writes.
    pub fn seal(&mut self) {
        self.packages.seal();
    }

    pub fn is_sealed(&self) -> bool {
        self.packages.is_sealed()
    }

    // ---- pass 1: declarations ----

    /// Record the type names a file's package clause brings into scope,
    /// before any of them are declared.
    pub fn index_package<'a>(
        &mut self,
        package: Option<&str>,
        names: impl IntoIterator<Item = &'a str>,
    ) {
        let package = package.unwrap_or("");
        for name in names {
            self.packages.add(package, name);
        }
    }

    /// Declare a type. Re-declaring `(name, package)` returns the existing id.
    pub fn declare_type(&mut self, spec: TypeSpec) -> TypeId {
        let key = (spec.name.clone(), package_key(spec.package.as_deref()));
        if let Some(&id) = self.type_keys.get(&key) {
            return id;
        }

        let id = TypeId(self.types.len() as u32);
        let package = key.1.clone();
        self.packages
            .bind(package.as_deref().unwrap_or(""), &spec.name, id);
        self.by_simple_name
            .entry(spec.name.clone())
            .or_default()
            .push(id);
        self.types.push(TypeRecord {
            id,
            name: spec.name,
            package,
            location: spec.location,
            is_interface: spec.is_interface,
            is_abstract: spec.is_abstract,
            superclass: spec.superclass,
            interfaces: spec.interfaces,
        });
        self.members_by_type.push(Vec::new());
        self.imports_by_type.push(Vec::new());
        self.links.push(Links::default());
        self.type_keys.insert(key, id);
        id
    }

    /// Declare a member. Re-declaring `(owner, signature)` returns the
    /// existing id.
    pub fn declare_member(&mut self, owner: TypeId, spec: MemberSpec) -> MemberId {
        let signature = format_signature(&spec.name, &spec.params);
        let key = (owner, signature);
        if let Some(&id) = self.member_keys.get(&key) {
            return id;
        }

        let id = MemberId(self.members.len() as u32);
        self.members.push(MemberRecord {
            id,
            owner,
            name: spec.name,
            signature: key.1.clone(),
            params: spec.params,
            return_type: spec.return_type,
            is_static: spec.is_static,
            is_public: spec.is_public,
            span: spec.span,
        });
        self.members_by_type[owner.index()].push(id);
        self.member_keys.insert(key, id);
        id
    }

    /// Declare a field. Re-declaring `(owner, name)` returns the existing id.
    pub fn declare_field(
        &mut self,
        owner: TypeId,
        name: &str,
        type_name: &str,
        is_static: bool,
    ) -> FieldId {
        let key = (owner, name.to_string());
        if let Some(&id) = self.field_keys.get(&key) {
            return id;
        }

        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldRecord {
            id,
            owner,
            name: name.to_string(),
            type_name: type_name.to_string(),
            is_static,
        });
        self.field_keys.insert(key, id);
        id
    }

    /// Declare an import owned by a type.
    pub fn declare_import(
        &mut self,
        owner: TypeId,
        path: &str,
        is_wildcard: bool,
        is_static: bool,
    ) -> ImportId {
        let key = (owner, path.to_string(), is_wildcard, is_static);
        if let Some(&id) = self.import_keys.get(&key) {
            return id;
        }

        let id = ImportId(self.imports.len() as u32);
        self.imports.push(ImportRecord {
            id,
            owner,
            path: path.to_string(),
            is_wildcard,
            is_static,
        });
        self.imports_by_type[owner.index()].push(id);
        self.import_keys.insert(key, id);
        id
    }

    /// Resolve every type's written superclass/interface names into links.
    ///
    /// `resolve` maps (declaring type, written name) to an identity; it sees
    /// the registry as it stands, so call this at the pass-1 barrier.
    pub fn link_hierarchy<F>(&mut self, mut resolve: F)
    where
        F: FnMut(&Registry, TypeId, &str) -> Option<TypeId>,
    {
        let links: Vec<Links> = self
            .types
            .iter()
            .map(|t| Links {
                superclass: t
                    .superclass
                    .as_deref()
                    .and_then(|name| resolve(self, t.id, name))
                    .filter(|&s| s != t.id),
                interfaces: t
                    .interfaces
                    .iter()
                    .filter_map(|name| resolve(self, t.id, name))
                    .filter(|&i| i != t.id)
                    .collect(),
            })
            .collect();
        self.links = links;
    }

    // ---- pass 2: edges ----

    /// Record a call edge. Re-recording `(caller, ordinal)` with the same
    /// content returns the existing id unchanged. Different content means the
    /// caller's body was edited: the edge takes the new content and loses its
    /// resolution, so pass 2 resolves it afresh.
    pub fn record_call(&mut self, caller: MemberId, ordinal: u32, spec: EdgeSpec) -> EdgeId {
        if let Some(&id) = self.edge_keys.get(&(caller, ordinal)) {
            let record = &mut self.edges[id.index()];
            if record.matches(&spec) {
                return id;
            }
            tracing::debug!(
                "call {} of member {} changed: {} -> {}",
                ordinal,
                caller,
                record.called_name,
                spec.called_name
            );
            let previous = record.resolved.take();
            record.resolved_type = None;
            record.kind = spec.kind;
            record.called_type_hint = spec.called_type_hint;
            record.called_name = spec.called_name;
            record.called_signature_hint = spec.called_signature_hint;
            record.line = spec.line;
            record.context = spec.context;
            if let Some(target) = previous {
                if let Some(list) = self.callers.get_mut(&target) {
                    list.retain(|&e| e != id);
                }
            }
            return id;
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(CallEdge {
            id,
            caller,
            ordinal,
            kind: spec.kind,
            called_type_hint: spec.called_type_hint,
            called_name: spec.called_name,
            called_signature_hint: spec.called_signature_hint,
            line: spec.line,
            resolved: None,
            resolved_type: None,
            context: spec.context,
        });
        self.edges_by_caller.entry(caller).or_default().push(id);
        self.edge_keys.insert((caller, ordinal), id);
        id
    }

    /// Drop the edges a re-analysed body no longer makes: for every caller in
    /// `counts`, edges at ordinals `>= counts[caller]`. Edge ids are
    /// renumbered densely. Returns the number of edges removed.
    pub fn retain_calls(&mut self, counts: &HashMap<MemberId, u32>) -> usize {
        let stale = |edge: &CallEdge| {
            counts
                .get(&edge.caller)
                .map_or(false, |&count| edge.ordinal >= count)
        };
        if !self.edges.iter().any(stale) {
            return 0;
        }

        let before = self.edges.len();
        let edges = std::mem::take(&mut self.edges);
        self.edge_keys.clear();
        self.edges_by_caller.clear();
        self.callers.clear();
        for mut edge in edges.into_iter().filter(|e| !stale(e)) {
            let id = EdgeId(self.edges.len() as u32);
            edge.id = id;
            self.edges_by_caller.entry(edge.caller).or_default().push(id);
            self.edge_keys.insert((edge.caller, edge.ordinal), id);
            if let Some(target) = edge.resolved {
                self.callers.entry(target).or_default().push(id);
            }
            self.edges.push(edge);
        }
        let removed = before - self.edges.len();
        tracing::debug!("dropped {} stale call edges", removed);
        removed
    }

    /// Set an edge's resolved target. Monotonic: returns false and leaves the
    /// edge untouched if a target is already set.
    pub fn set_resolved(&mut self, edge: EdgeId, target: MemberId) -> bool {
        let Some(record) = self.edges.get_mut(edge.index()) else {
            return false;
        };
        if record.resolved.is_some() {
            return false;
        }
        record.resolved = Some(target);
        self.callers.entry(target).or_default().push(edge);
        true
    }

    /// Set the edge's resolved target type if none is recorded yet.
    pub fn set_resolved_type(&mut self, edge: EdgeId, fqn: &str) {
        if let Some(record) = self.edges.get_mut(edge.index()) {
            if record.resolved_type.is_none() {
                record.resolved_type = Some(fqn.to_string());
            }
        }
    }

    // ---- lookups ----

    /// Look up a type by simple name and package.
    pub fn lookup_type(&self, name: &str, package: Option<&str>) -> Option<TypeId> {
        self.type_keys
            .get(&(name.to_string(), package_key(package)))
            .copied()
    }

    /// Look up `pkg.Name` (or a bare `Name` in the default package).
    pub fn lookup_qualified(&self, fqn: &str) -> Option<TypeId> {
        match fqn.rsplit_once('.') {
            Some((package, name)) => self.lookup_type(name, Some(package)),
            None => self.lookup_type(fqn, None),
        }
    }

    /// All types with the given simple name, in declaration order.
    pub fn types_named(&self, name: &str) -> &[TypeId] {
        self.by_simple_name
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a member by owner and normalized signature.
    pub fn lookup_member(&self, owner: TypeId, signature: &str) -> Option<MemberId> {
        self.member_keys.get(&(owner, signature.to_string())).copied()
    }

    pub fn package_index(&self) -> &PackageIndex {
        &self.packages
    }

    pub fn type_record(&self, id: TypeId) -> &TypeRecord {
        &self.types[id.index()]
    }

    pub fn member(&self, id: MemberId) -> &MemberRecord {
        &self.members[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &FieldRecord {
        &self.fields[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &CallEdge {
        &self.edges[id.index()]
    }

    pub fn get_member(&self, id: MemberId) -> Option<&MemberRecord> {
        self.members.get(id.index())
    }

    pub fn types(&self) -> &[TypeRecord] {
        &self.types
    }

    pub fn members(&self) -> &[MemberRecord] {
        &self.members
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn imports(&self) -> &[ImportRecord] {
        &self.imports
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    /// Members declared directly on `owner`, in declaration order.
    pub fn declared_members(&self, owner: TypeId) -> &[MemberId] {
        self.members_by_type
            .get(owner.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Members of a type, optionally followed by inherited ones: the
    /// superclass chain first, then each interface chain. Cyclic or
    /// self-referential hierarchies are visited once.
    pub fn members_of(&self, owner: TypeId, including_inherited: bool) -> Vec<MemberId> {
        if !including_inherited {
            return self.declared_members(owner).to_vec();
        }

        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_members(owner, &mut visited, &mut out);
        out
    }

    fn collect_members(&self, owner: TypeId, visited: &mut HashSet<TypeId>, out: &mut Vec<MemberId>) {
        if !visited.insert(owner) {
            return;
        }
        out.extend_from_slice(self.declared_members(owner));
        if let Some(links) = self.links.get(owner.index()) {
            if let Some(superclass) = links.superclass {
                self.collect_members(superclass, visited, out);
            }
            for &interface in &links.interfaces {
                self.collect_members(interface, visited, out);
            }
        }
    }

    /// Members named `name`, own before inherited.
    pub fn find_members(&self, owner: TypeId, name: &str, including_inherited: bool) -> Vec<MemberId> {
        self.members_of(owner, including_inherited)
            .into_iter()
            .filter(|&m| self.member(m).name == name)
            .collect()
    }

    /// Find a field on `owner` or, failing that, up its superclass chain.
    pub fn find_field(&self, owner: TypeId, name: &str) -> Option<&FieldRecord> {
        let mut visited = HashSet::new();
        let mut current = Some(owner);
        while let Some(t) = current {
            if !visited.insert(t) {
                break;
            }
            if let Some(&id) = self.field_keys.get(&(t, name.to_string())) {
                return Some(self.field(id));
            }
            current = self.superclass_of(t);
        }
        None
    }

    /// Imports owned by a type, in declaration order.
    pub fn imports_of(&self, owner: TypeId) -> impl Iterator<Item = &ImportRecord> {
        self.imports_by_type
            .get(owner.index())
            .into_iter()
            .flatten()
            .map(|&id| &self.imports[id.index()])
    }

    pub fn superclass_of(&self, owner: TypeId) -> Option<TypeId> {
        self.links.get(owner.index()).and_then(|l| l.superclass)
    }

    /// Outgoing edges of a member, in walk order.
    pub fn edges_from(&self, caller: MemberId) -> &[EdgeId] {
        self.edges_by_caller
            .get(&caller)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Edges resolved to `target`, in resolution order.
    pub fn callers_of(&self, target: MemberId) -> &[EdgeId] {
        self.callers
            .get(&target)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// `pkg.Type.signature` label for a member.
    pub fn member_label(&self, id: MemberId) -> String {
        let member = self.member(id);
        format!(
            "{}.{}",
            self.type_record(member.owner).qualified_name(),
            member.signature
        )
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            types: self.types.len(),
            members: self.members.len(),
            fields: self.fields.len(),
            imports: self.imports.len(),
            edges: self.edges.len(),
            resolved_edges: self.edges.iter().filter(|e| e.resolved.is_some()).count(),
        }
    }
}
