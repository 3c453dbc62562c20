//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from record descriptors.

use crate::model::{Include, RecordDescriptor, Row};
use crate::sql::PgBindValue;

/// Relation depth followed for includes and cascades; deeper levels are ignored.
pub const MAX_RELATION_DEPTH: usize = 8;

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL (safe: only from descriptors).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(desc: &RecordDescriptor) -> String {
    match desc.schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(desc.table)),
        None => quoted(desc.table),
    }
}

fn returning_id(desc: &RecordDescriptor) -> String {
    format!("RETURNING {}::bigint", quoted(desc.id_column))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }

    /// Placeholder for a column value, cast to the column's declared type. Untyped NULLs are
    /// inlined so PostgreSQL infers the type from the target column.
    fn placeholder(&mut self, desc: &RecordDescriptor, column: &str, value: &serde_json::Value) -> String {
        let pg_type = desc.column(column).and_then(|c| c.pg_type);
        if value.is_null() && pg_type.is_none() {
            return "NULL".into();
        }
        let n = self.push_param(PgBindValue::from_json(value, pg_type));
        match pg_type {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

/// INSERT: declared columns present in the row, in descriptor order. The identifier is never
/// written; the backend assigns it and it is returned.
pub fn insert(desc: &RecordDescriptor, row: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(desc);
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in desc.columns {
        let Some(val) = row.get(c.name) else { continue };
        placeholders.push(q.placeholder(desc, c.name, val));
        cols.push(quoted(c.name));
    }
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES {}", table, returning_id(desc))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning_id(desc)
        )
    };
    q
}

/// JSON expression for one row of `desc` under `alias`, with each include attached under its
/// relation name as an array (empty when there are no children).
fn record_expr(desc: &RecordDescriptor, alias: &str, includes: &[Include], depth: usize) -> String {
    let row = format!("to_jsonb({})", alias);
    if includes.is_empty() || depth >= MAX_RELATION_DEPTH {
        return row;
    }
    let pairs: Vec<String> = includes
        .iter()
        .map(|inc| {
            format!(
                "'{}', {}",
                inc.relation.name.replace('\'', "''"),
                include_subquery(desc, alias, inc, depth + 1)
            )
        })
        .collect();
    format!("({} || jsonb_build_object({}))", row, pairs.join(", "))
}

fn include_subquery(parent: &RecordDescriptor, parent_alias: &str, inc: &Include, depth: usize) -> String {
    let child = inc.child();
    let alias = format!("sub{}", depth);
    format!(
        "(SELECT COALESCE(jsonb_agg({} ORDER BY {}.{}), '[]'::jsonb) FROM {} {} WHERE {}.{} = {}.{})",
        record_expr(child, &alias, &inc.nested, depth),
        alias,
        quoted(child.id_column),
        qualified_table(child),
        alias,
        alias,
        quoted(inc.relation.foreign_key),
        parent_alias,
        quoted(parent.id_column)
    )
}

/// SELECT one record by identifier as a single JSON column `record`. Caller binds the id as $1.
pub fn select_by_id(desc: &RecordDescriptor, includes: &[Include]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} AS record FROM {} {} WHERE {}.{} = $1",
        record_expr(desc, MAIN_ALIAS, includes, 0),
        qualified_table(desc),
        MAIN_ALIAS,
        MAIN_ALIAS,
        quoted(desc.id_column)
    );
    q
}

/// SELECT every record as JSON, ORDER BY identifier.
pub fn select_all(desc: &RecordDescriptor, includes: &[Include]) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} AS record FROM {} {} ORDER BY {}.{}",
        record_expr(desc, MAIN_ALIAS, includes, 0),
        qualified_table(desc),
        MAIN_ALIAS,
        MAIN_ALIAS,
        quoted(desc.id_column)
    );
    q
}

/// UPDATE by id: SET only declared columns present in the patch. An empty patch becomes an
/// existence probe so callers still learn whether the row is there.
pub fn update(desc: &RecordDescriptor, id: u64, patch: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(desc);
    let pk = quoted(desc.id_column);
    let mut sets = Vec::new();
    for c in desc.columns {
        let Some(val) = patch.get(c.name) else { continue };
        let rhs = q.placeholder(desc, c.name, val);
        sets.push(format!("{} = {}", quoted(c.name), rhs));
    }
    let id_param = q.push_param(PgBindValue::id(id));
    q.sql = if sets.is_empty() {
        format!("SELECT {}::bigint FROM {} WHERE {} = ${}", pk, table, pk, id_param)
    } else {
        format!(
            "UPDATE {} SET {} WHERE {} = ${} {}",
            table,
            sets.join(", "),
            pk,
            id_param,
            returning_id(desc)
        )
    };
    q
}

/// DELETE by id. Caller binds the id as $1.
pub fn delete(desc: &RecordDescriptor) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1 {}",
        qualified_table(desc),
        quoted(desc.id_column),
        returning_id(desc)
    );
    q
}

/// DELETE statements removing every descendant of the record bound as $1, deepest relations
/// first. Run them before `delete` in the same transaction.
pub fn cascade_deletes(desc: &RecordDescriptor) -> Vec<String> {
    let mut out = Vec::new();
    push_cascade(desc, "$1", 0, &mut out);
    out
}

fn push_cascade(desc: &RecordDescriptor, parent_keys: &str, depth: usize, out: &mut Vec<String>) {
    if depth >= MAX_RELATION_DEPTH {
        return;
    }
    for rel in desc.relations {
        let child = rel.child();
        let table = qualified_table(child);
        let child_keys = format!(
            "SELECT {} FROM {} WHERE {} IN ({})",
            quoted(child.id_column),
            table,
            quoted(rel.foreign_key),
            parent_keys
        );
        push_cascade(child, &child_keys, depth + 1, out);
        out.push(format!(
            "DELETE FROM {} WHERE {} IN ({})",
            table,
            quoted(rel.foreign_key),
            parent_keys
        ));
    }
}
