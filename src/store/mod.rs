//! SQLite persistence for the registry.
//!
//! A store is an explicit handle: every operation takes it, so two analyses
//! in one process just use two stores.

mod schema;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use crate::analysis::{
    parse_signature_params, CallContext, CallKind, ConditionalKind, LineSpan, LoopKind,
};
use crate::error::StoreError;
use crate::registry::{EdgeSpec, MemberId, MemberSpec, Registry, TypeId, TypeSpec};
use crate::resolve::{self, ResolveOptions};

const CLEAR_TABLES: &str = "DELETE FROM call_edges; DELETE FROM fields; DELETE FROM imports; \
     DELETE FROM members; DELETE FROM types;";

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub types: usize,
    pub members: usize,
    pub fields: usize,
    pub imports: usize,
    pub edges: usize,
}

pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("cannot create {}: {}", parent.display(), e);
            }
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        schema::apply(&conn).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("opened store {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        schema::apply(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Delete every row.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(CLEAR_TABLES)?;
        Ok(())
    }

    pub fn counts(&self) -> Result<StoreCounts, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(StoreCounts {
            types: count("types")?,
            members: count("members")?,
            fields: count("fields")?,
            imports: count("imports")?,
            edges: count("call_edges")?,
        })
    }

    /// Persist the registry in one transaction.
    ///
    /// The tables are rewritten from the registry, which the caller loaded
    /// from this store before analysing, so rows always carry the registry's
    /// own ids and edges removed from the source leave the store too.
    pub fn save(&mut self, registry: &Registry) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(CLEAR_TABLES)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO types
                 (id, name, package, location, is_interface, is_abstract, superclass, interfaces)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for t in registry.types() {
                stmt.execute(params![
                    t.id.db_id(),
                    t.name,
                    t.package.as_deref().unwrap_or(""),
                    t.location,
                    t.is_interface,
                    t.is_abstract,
                    t.superclass,
                    t.interfaces.join(","),
                ])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO members
                 (id, type_id, name, signature, return_type, is_static, is_public, start_line, end_line)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for m in registry.members() {
                stmt.execute(params![
                    m.id.db_id(),
                    m.owner.db_id(),
                    m.name,
                    m.signature,
                    m.return_type,
                    m.is_static,
                    m.is_public,
                    m.span.start,
                    m.span.end,
                ])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO fields (id, type_id, name, type_name, is_static)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for f in registry.fields() {
                stmt.execute(params![f.id.db_id(), f.owner.db_id(), f.name, f.type_name, f.is_static])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO imports (id, type_id, path, is_wildcard, is_static)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for i in registry.imports() {
                stmt.execute(params![i.id.db_id(), i.owner.db_id(), i.path, i.is_wildcard, i.is_static])?;
            }

            let mut stmt = tx.prepare_cached(
                "INSERT INTO call_edges
                 (id, caller_member_id, call_ordinal, kind, called_type_hint, called_name,
                  called_signature_hint, line_number, resolved_member_id, resolved_type,
                  in_try, in_catch, in_finally, loop_kind, conditional_kind, in_lambda)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;
            for e in registry.edges() {
                let ctx = &e.context;
                stmt.execute(params![
                    e.id.db_id(),
                    e.caller.db_id(),
                    e.ordinal,
                    e.kind.as_str(),
                    e.called_type_hint,
                    e.called_name,
                    e.called_signature_hint,
                    e.line,
                    e.resolved.map(|m| m.db_id()),
                    e.resolved_type,
                    ctx.in_try,
                    ctx.in_catch,
                    ctx.in_finally,
                    ctx.loop_kind.map(|k| k.as_str()),
                    ctx.conditional.map(|k| k.as_str()),
                    ctx.in_lambda,
                ])?;
            }
        }
        tx.commit()?;

        let stats = registry.stats();
        tracing::info!(
            "saved {} types, {} members, {} call edges",
            stats.types,
            stats.members,
            stats.edges
        );
        Ok(())
    }

    /// Rebuild a registry, derived indexes included, from the stored rows.
    pub fn load(&self, options: &ResolveOptions) -> Result<Registry, StoreError> {
        let mut registry = Registry::new();
        let mut types: HashMap<i64, TypeId> = HashMap::new();
        let mut members: HashMap<i64, MemberId> = HashMap::new();

        let mut stmt = self.conn.prepare(
            "SELECT id, name, package, location, is_interface, is_abstract, superclass, interfaces
             FROM types ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let package: String = row.get(2)?;
            let interfaces: String = row.get(7)?;
            Ok((
                row.get::<_, i64>(0)?,
                TypeSpec {
                    name: row.get(1)?,
                    package: (!package.is_empty()).then_some(package),
                    location: row.get(3)?,
                    is_interface: row.get(4)?,
                    is_abstract: row.get(5)?,
                    superclass: row.get(6)?,
                    interfaces: interfaces
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect(),
                },
            ))
        })?;
        for row in rows {
            let (db_id, spec) = row?;
            registry.index_package(spec.package.as_deref(), [spec.name.as_str()]);
            types.insert(db_id, registry.declare_type(spec));
        }

        let owner = |types: &HashMap<i64, TypeId>, db_id: i64, table: &str| {
            types
                .get(&db_id)
                .copied()
                .ok_or_else(|| StoreError::Corrupt(format!("{} row references missing type {}", table, db_id)))
        };

        let mut stmt = self.conn.prepare(
            "SELECT id, type_id, name, signature, return_type, is_static, is_public, start_line, end_line
             FROM members ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let signature: String = row.get(3)?;
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                MemberSpec {
                    name: row.get(2)?,
                    params: parse_signature_params(&signature),
                    return_type: row.get(4)?,
                    is_static: row.get(5)?,
                    is_public: row.get(6)?,
                    span: LineSpan {
                        start: row.get(7)?,
                        end: row.get(8)?,
                    },
                },
            ))
        })?;
        for row in rows {
            let (db_id, type_id, spec) = row?;
            let owner = owner(&types, type_id, "members")?;
            members.insert(db_id, registry.declare_member(owner, spec));
        }

        let mut stmt = self
            .conn
            .prepare("SELECT type_id, name, type_name, is_static FROM fields ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;
        for row in rows {
            let (type_id, name, type_name, is_static) = row?;
            let owner = owner(&types, type_id, "fields")?;
            registry.declare_field(owner, &name, &type_name, is_static);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT type_id, path, is_wildcard, is_static FROM imports ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;
        for row in rows {
            let (type_id, path, is_wildcard, is_static) = row?;
            let owner = owner(&types, type_id, "imports")?;
            registry.declare_import(owner, &path, is_wildcard, is_static);
        }

        let mut stmt = self.conn.prepare(
            "SELECT caller_member_id, call_ordinal, kind, called_type_hint, called_name,
                    called_signature_hint, line_number, resolved_member_id, resolved_type,
                    in_try, in_catch, in_finally, loop_kind, conditional_kind, in_lambda
             FROM call_edges ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EdgeRow {
                caller: row.get(0)?,
                ordinal: row.get(1)?,
                kind: row.get(2)?,
                called_type_hint: row.get(3)?,
                called_name: row.get(4)?,
                called_signature_hint: row.get(5)?,
                line: row.get(6)?,
                resolved: row.get(7)?,
                resolved_type: row.get(8)?,
                in_try: row.get(9)?,
                in_catch: row.get(10)?,
                in_finally: row.get(11)?,
                loop_kind: row.get(12)?,
                conditional_kind: row.get(13)?,
                in_lambda: row.get(14)?,
            })
        })?;
        for row in rows {
            let row = row?;
            let caller = members.get(&row.caller).copied().ok_or_else(|| {
                StoreError::Corrupt(format!("call edge references missing member {}", row.caller))
            })?;
            let kind = CallKind::parse(&row.kind)
                .ok_or_else(|| StoreError::Corrupt(format!("unknown call kind '{}'", row.kind)))?;
            let context = CallContext {
                in_try: row.in_try,
                in_catch: row.in_catch,
                in_finally: row.in_finally,
                loop_kind: row.loop_kind.as_deref().and_then(LoopKind::parse),
                conditional: row.conditional_kind.as_deref().and_then(ConditionalKind::parse),
                in_lambda: row.in_lambda,
            };
            let id = registry.record_call(
                caller,
                row.ordinal,
                EdgeSpec {
                    kind,
                    called_type_hint: row.called_type_hint,
                    called_name: row.called_name,
                    called_signature_hint: row.called_signature_hint,
                    line: row.line,
                    context,
                },
            );
            if let Some(fqn) = &row.resolved_type {
                registry.set_resolved_type(id, fqn);
            }
            if let Some(target) = row.resolved.and_then(|t| members.get(&t).copied()) {
                registry.set_resolved(id, target);
            }
        }

        resolve::link_hierarchy(&mut registry, options);
        registry.seal();
        let stats = registry.stats();
        tracing::debug!(
            "loaded {} types, {} members, {} call edges",
            stats.types,
            stats.members,
            stats.edges
        );
        Ok(registry)
    }
}

struct EdgeRow {
    caller: i64,
    ordinal: u32,
    kind: String,
    called_type_hint: Option<String>,
    called_name: String,
    called_signature_hint: Option<String>,
    line: u32,
    resolved: Option<i64>,
    resolved_type: Option<String>,
    in_try: bool,
    in_catch: bool,
    in_finally: bool,
    loop_kind: Option<String>,
    conditional_kind: Option<String>,
    in_lambda: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CONSTRUCTOR_NAME;

    fn sample() -> (Registry, MemberId, MemberId) {
        let mut reg = Registry::new();
        let base = reg.declare_type(TypeSpec {
            name: "Base".to_string(),
            package: Some("app".to_string()),
            location: "app/Base.java".to_string(),
            is_abstract: true,
            ..Default::default()
        });
        let main = reg.declare_type(TypeSpec {
            name: "Main".to_string(),
            location: "Main.java".to_string(),
            superclass: Some("Base".to_string()),
            interfaces: vec!["Runnable".to_string(), "Cloneable".to_string()],
            ..Default::default()
        });
        reg.declare_import(main, "app", true, false);
        reg.declare_field(main, "count", "int", false);
        let helper = reg.declare_member(
            base,
            MemberSpec {
                name: "helper".to_string(),
                params: vec!["int".to_string(), "String[]".to_string()],
                return_type: "void".to_string(),
                is_public: true,
                span: LineSpan { start: 3, end: 5 },
                ..Default::default()
            },
        );
        let run = reg.declare_member(
            main,
            MemberSpec {
                name: "run".to_string(),
                return_type: "void".to_string(),
                span: LineSpan { start: 4, end: 9 },
                ..Default::default()
            },
        );
        reg.declare_member(
            main,
            MemberSpec {
                name: CONSTRUCTOR_NAME.to_string(),
                return_type: "Main".to_string(),
                ..Default::default()
            },
        );
        let edge = reg.record_call(
            run,
            0,
            EdgeSpec {
                kind: CallKind::Invocation,
                called_type_hint: None,
                called_name: "helper".to_string(),
                called_signature_hint: Some("helper(int,Object)".to_string()),
                line: 6,
                context: CallContext {
                    in_try: true,
                    loop_kind: Some(LoopKind::Foreach),
                    ..Default::default()
                },
            },
        );
        reg.set_resolved_type(edge, "app.Base");
        reg.set_resolved(edge, helper);
        reg.record_call(
            run,
            1,
            EdgeSpec {
                kind: CallKind::Reference,
                called_type_hint: Some("System.out".to_string()),
                called_name: "println".to_string(),
                called_signature_hint: None,
                line: 7,
                context: CallContext::default(),
            },
        );
        (reg, run, helper)
    }

    #[test]
    fn test_roundtrip() {
        let (reg, run, helper) = sample();
        let mut store = Store::open_in_memory().unwrap();
        store.save(&reg).unwrap();

        let loaded = store.load(&ResolveOptions::default()).unwrap();
        assert_eq!(loaded.stats(), reg.stats());
        assert!(loaded.is_sealed());

        let main = loaded.lookup_type("Main", None).unwrap();
        assert_eq!(loaded.type_record(main).interfaces, vec!["Runnable", "Cloneable"]);
        assert_eq!(
            loaded.superclass_of(main),
            loaded.lookup_qualified("app.Base")
        );
        assert_eq!(loaded.member(helper).params, vec!["int", "String[]"]);
        assert_eq!(loaded.member(helper).span, LineSpan { start: 3, end: 5 });

        let edges = loaded.edges_from(run);
        assert_eq!(edges.len(), 2);
        let first = loaded.edge(edges[0]);
        assert_eq!(first.resolved, Some(helper));
        assert_eq!(first.resolved_type.as_deref(), Some("app.Base"));
        assert!(first.context.in_try);
        assert_eq!(first.context.loop_kind, Some(LoopKind::Foreach));
        assert_eq!(loaded.edge(edges[1]).kind, CallKind::Reference);
        assert_eq!(loaded.callers_of(helper), &[edges[0]]);
    }

    #[test]
    fn test_save_twice_adds_no_rows() {
        let (reg, _, _) = sample();
        let mut store = Store::open_in_memory().unwrap();
        store.save(&reg).unwrap();
        let once = store.counts().unwrap();
        store.save(&reg).unwrap();
        assert_eq!(store.counts().unwrap(), once);
        assert_eq!(
            once,
            StoreCounts {
                types: 2,
                members: 3,
                fields: 1,
                imports: 1,
                edges: 2
            }
        );
    }

    #[test]
    fn test_resolution_fills_in_later() {
        let (mut reg, run, helper) = sample();
        let mut store = Store::open_in_memory().unwrap();
        store.save(&reg).unwrap();

        let late = reg.edges_from(run)[1];
        reg.set_resolved(late, helper);
        store.save(&reg).unwrap();

        let loaded = store.load(&ResolveOptions::default()).unwrap();
        assert_eq!(loaded.edge(late).resolved, Some(helper));
    }

    #[test]
    fn test_cascades() {
        let (reg, run, helper) = sample();
        let mut store = Store::open_in_memory().unwrap();
        store.save(&reg).unwrap();

        // Deleting the target type clears resolved references.
        let base = reg.member(helper).owner;
        store
            .conn
            .execute("DELETE FROM types WHERE id = ?1", params![base.db_id()])
            .unwrap();
        let resolved: Option<i64> = store
            .conn
            .query_row(
                "SELECT resolved_member_id FROM call_edges WHERE caller_member_id = ?1 AND call_ordinal = 0",
                params![run.db_id()],
                |row| row.get(0),
            )
            .unwrap();
        assert!(resolved.is_none());

        // Deleting the caller's type removes its members and their edges.
        let main = reg.member(run).owner;
        store
            .conn
            .execute("DELETE FROM types WHERE id = ?1", params![main.db_id()])
            .unwrap();
        assert_eq!(store.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn test_save_after_id_gaps_matches_loaded_registry() {
        let (reg, _, _) = sample();
        let mut store = Store::open_in_memory().unwrap();
        store.save(&reg).unwrap();

        // Dropping `app.Base` leaves a gap at row id 1; load renumbers densely.
        store
            .conn
            .execute("DELETE FROM types WHERE name = 'Base'", [])
            .unwrap();
        let loaded = store.load(&ResolveOptions::default()).unwrap();
        assert_eq!(loaded.type_record(TypeId(0)).name, "Main");

        store.save(&loaded).unwrap();
        let counts = store.counts().unwrap();
        assert_eq!((counts.types, counts.members, counts.edges), (1, 2, 2));

        let again = store.load(&ResolveOptions::default()).unwrap();
        assert_eq!(again.stats(), loaded.stats());
        let labels = |r: &Registry| -> Vec<String> {
            r.members().iter().map(|m| r.member_label(m.id)).collect()
        };
        assert_eq!(labels(&again), labels(&loaded));
        assert_eq!(labels(&again), vec!["Main.run()", "Main.<init>()"]);
        let stored_type: i64 = store
            .conn
            .query_row("SELECT type_id FROM members WHERE name = 'run'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored_type, 1);
    }

    #[test]
    fn test_save_drops_edges_gone_from_registry() {
        let (reg, _, _) = sample();
        let mut store = Store::open_in_memory().unwrap();
        store.save(&reg).unwrap();

        let mut trimmed = store.load(&ResolveOptions::default()).unwrap();
        let run = trimmed.lookup_member(trimmed.lookup_type("Main", None).unwrap(), "run()").unwrap();
        assert_eq!(trimmed.retain_calls(&HashMap::from([(run, 1)])), 1);
        store.save(&trimmed).unwrap();

        assert_eq!(store.counts().unwrap().edges, 1);
    }

    #[test]
    fn test_reset_and_file_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/graph.db");
        let (reg, _, _) = sample();

        let mut store = Store::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        store.save(&reg).unwrap();
        drop(store);

        let mut store = Store::open(&path).unwrap();
        assert_eq!(store.counts().unwrap().members, 3);
        store.reset().unwrap();
        assert_eq!(store.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn test_open_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        // A directory cannot be opened as a database file.
        let result = Store::open(temp.path());
        assert!(matches!(result, Err(StoreError::Open { .. })));
    }
}
