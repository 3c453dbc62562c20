//! Static record metadata: table, identifier column, persisted columns and child relations.

use crate::error::ConfigError;
use crate::sql::MAX_RELATION_DEPTH;
use std::collections::HashSet;

/// One persisted, non-identifier column.
#[derive(Clone, Copy, Debug)]
pub struct ColumnDescriptor {
    pub name: &'static str,
    /// PostgreSQL type name for SQL casts (e.g. "date", "timestamptz") when binding JSON values.
    pub pg_type: Option<&'static str>,
    /// Whether the backend enforces a uniqueness constraint on this column.
    pub unique: bool,
}

impl ColumnDescriptor {
    pub const fn new(name: &'static str) -> Self {
        ColumnDescriptor {
            name,
            pg_type: None,
            unique: false,
        }
    }

    pub const fn typed(self, pg_type: &'static str) -> Self {
        ColumnDescriptor {
            pg_type: Some(pg_type),
            ..self
        }
    }

    pub const fn unique(self) -> Self {
        ColumnDescriptor {
            unique: true,
            ..self
        }
    }
}

/// A to-many relation: child rows point back at the parent through `foreign_key`.
#[derive(Clone, Copy, Debug)]
pub struct RelationDescriptor {
    /// API name of the relation; also the JSON key the loaded children appear under.
    pub name: &'static str,
    /// Column on the child table holding the parent's identifier.
    pub foreign_key: &'static str,
    pub child: fn() -> &'static RecordDescriptor,
}

impl RelationDescriptor {
    pub fn child(&self) -> &'static RecordDescriptor {
        (self.child)()
    }
}

#[derive(Debug)]
pub struct RecordDescriptor {
    /// Resource name used in logs and error messages.
    pub name: &'static str,
    pub schema: Option<&'static str>,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: &'static [ColumnDescriptor],
    pub relations: &'static [RelationDescriptor],
}

impl RecordDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDescriptor> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn unique_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.unique)
    }

    /// Check this descriptor and every descriptor reachable through its relations.
    /// Run once when a resource is registered. Relation cycles and trees deeper than
    /// [`MAX_RELATION_DEPTH`] are rejected, since loads and cascades stop there.
    pub fn validate(&'static self) -> Result<(), ConfigError> {
        let mut path = Vec::new();
        self.validate_tree(&mut path)
    }

    fn validate_tree(&'static self, path: &mut Vec<&'static RecordDescriptor>) -> Result<(), ConfigError> {
        let fail = |message: String| ConfigError::Descriptor {
            record: self.name,
            message,
        };
        if self.table.is_empty() {
            return Err(fail("table name is empty".into()));
        }
        if self.id_column.is_empty() {
            return Err(fail("no identifier column".into()));
        }
        let mut names = HashSet::new();
        for column in self.columns {
            if column.name == self.id_column {
                return Err(fail(format!("identifier '{}' listed as a column", column.name)));
            }
            if !names.insert(column.name) {
                return Err(fail(format!("column '{}' declared twice", column.name)));
            }
        }
        if self.relations.is_empty() {
            return Ok(());
        }
        if path.len() >= MAX_RELATION_DEPTH {
            return Err(fail(format!("relations nested deeper than {} levels", MAX_RELATION_DEPTH)));
        }

        path.push(self);
        for relation in self.relations {
            if !names.insert(relation.name) {
                return Err(fail(format!("relation '{}' collides with another field", relation.name)));
            }
            let child = relation.child();
            if path.iter().any(|d| std::ptr::eq(*d, child)) {
                return Err(fail(format!(
                    "relation '{}' leads back to {}",
                    relation.name, child.name
                )));
            }
            if child.column(relation.foreign_key).is_none() {
                return Err(fail(format!(
                    "relation '{}': {} has no column '{}'",
                    relation.name, child.name, relation.foreign_key
                )));
            }
            child.validate_tree(path)?;
        }
        path.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ITEM: RecordDescriptor = RecordDescriptor {
        name: "item",
        schema: None,
        table: "item",
        id_column: "id",
        columns: &[
            ColumnDescriptor::new("order_id"),
            ColumnDescriptor::new("sku").unique(),
            ColumnDescriptor::new("shipped_on").typed("date"),
        ],
        relations: &[],
    };

    fn item() -> &'static RecordDescriptor {
        &ITEM
    }

    static ORDER: RecordDescriptor = RecordDescriptor {
        name: "order",
        schema: Some("shop"),
        table: "orders",
        id_column: "id",
        columns: &[ColumnDescriptor::new("reference")],
        relations: &[RelationDescriptor {
            name: "items",
            foreign_key: "order_id",
            child: item,
        }],
    };

    #[test]
    fn column_lookup_and_flags() {
        assert!(ITEM.column("sku").is_some_and(|c| c.unique));
        assert_eq!(ITEM.column("shipped_on").and_then(|c| c.pg_type), Some("date"));
        assert!(ITEM.column("id").is_none());
        let unique: Vec<_> = ITEM.unique_columns().map(|c| c.name).collect();
        assert_eq!(unique, vec!["sku"]);
    }

    static BROKEN: RecordDescriptor = RecordDescriptor {
        name: "broken",
        schema: None,
        table: "broken",
        id_column: "id",
        columns: &[ColumnDescriptor::new("label")],
        relations: &[RelationDescriptor {
            name: "items",
            foreign_key: "broken_id",
            child: item,
        }],
    };

    static DUPLICATE: RecordDescriptor = RecordDescriptor {
        name: "duplicate",
        schema: None,
        table: "duplicate",
        id_column: "id",
        columns: &[ColumnDescriptor::new("id"), ColumnDescriptor::new("label")],
        relations: &[],
    };

    #[test]
    fn validate_accepts_consistent_tree() {
        ORDER.validate().unwrap();
        ITEM.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_foreign_key_and_id_column_clash() {
        let err = BROKEN.validate().unwrap_err();
        assert!(err.to_string().contains("broken_id"), "{err}");
        let err = DUPLICATE.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Descriptor { record: "duplicate", .. }));
    }

    fn node() -> &'static RecordDescriptor {
        &NODE
    }

    static NODE: RecordDescriptor = RecordDescriptor {
        name: "node",
        schema: None,
        table: "node",
        id_column: "id",
        columns: &[ColumnDescriptor::new("parent_id")],
        relations: &[RelationDescriptor {
            name: "children",
            foreign_key: "parent_id",
            child: node,
        }],
    };

    #[test]
    fn validate_rejects_relation_cycles() {
        let err = NODE.validate().unwrap_err();
        assert!(err.to_string().contains("leads back to node"), "{err}");
    }

    macro_rules! chain {
        ($desc:ident -> $next_fn:ident, $next:ident) => {
            fn $next_fn() -> &'static RecordDescriptor {
                &$next
            }
            static $desc: RecordDescriptor = RecordDescriptor {
                name: "level",
                schema: None,
                table: "level",
                id_column: "id",
                columns: &[ColumnDescriptor::new("up_id")],
                relations: &[RelationDescriptor {
                    name: "next",
                    foreign_key: "up_id",
                    child: $next_fn,
                }],
            };
        };
    }

    chain!(L0 -> l1, L1);
    chain!(L1 -> l2, L2);
    chain!(L2 -> l3, L3);
    chain!(L3 -> l4, L4);
    chain!(L4 -> l5, L5);
    chain!(L5 -> l6, L6);
    chain!(L6 -> l7, L7);
    chain!(L7 -> l8, L8);
    chain!(L8 -> l9, L9);
    static L9: RecordDescriptor = RecordDescriptor {
        name: "level",
        schema: None,
        table: "level",
        id_column: "id",
        columns: &[ColumnDescriptor::new("up_id")],
        relations: &[],
    };

    #[test]
    fn validate_rejects_trees_deeper_than_the_cascade_limit() {
        let err = L0.validate().unwrap_err();
        assert!(err.to_string().contains("deeper than 8"), "{err}");
        L2.validate().unwrap();
    }

    #[test]
    fn relation_resolves_child_descriptor() {
        let rel = ORDER.relation("items").expect("declared");
        assert_eq!(rel.foreign_key, "order_id");
        assert_eq!(rel.child().table, "item");
        assert!(ORDER.relation("lines").is_none());
    }
}
