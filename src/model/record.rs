//! Compile-time record capabilities: identifier access, child collections, foreign-key assignment.

use crate::model::RecordDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A column-name → JSON-value map as handed to the persistence gateway.
pub type Row = Map<String, Value>;

/// A persistable entity with a backend-assigned numeric identifier.
///
/// The serialized form of a record must use the descriptor's column names as keys and each
/// relation's `name` as the key of its child collection, so rows read back from the gateway
/// (with eager-loaded relations) deserialize straight into `Self`.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Partial-update shape: every field optional, absent fields skipped when serialized.
    type Patch: Serialize + DeserializeOwned + Send;

    fn descriptor() -> &'static RecordDescriptor;

    fn id(&self) -> Option<u64>;

    fn set_id(&mut self, id: u64);

    /// Child collections to persist after this record, in declaration order.
    fn children(&mut self) -> Vec<ChildSet<'_>> {
        Vec::new()
    }
}

/// A record owned by a parent through a foreign-key column.
pub trait ChildRecord: Record {
    fn set_parent_key(&mut self, parent_id: u64);
}

/// Object-safe view of a child record, so collections of different child types can be
/// walked in one pass.
pub trait ChildRow: Send {
    fn row_descriptor(&self) -> &'static RecordDescriptor;

    fn assign_parent(&mut self, parent_id: u64);

    fn assign_id(&mut self, id: u64);

    fn to_row(&self) -> Result<Row, serde_json::Error>;

    fn nested(&mut self) -> Vec<ChildSet<'_>>;
}

impl<C: ChildRecord> ChildRow for C {
    fn row_descriptor(&self) -> &'static RecordDescriptor {
        <C as Record>::descriptor()
    }

    fn assign_parent(&mut self, parent_id: u64) {
        self.set_parent_key(parent_id);
    }

    fn assign_id(&mut self, id: u64) {
        self.set_id(id);
    }

    fn to_row(&self) -> Result<Row, serde_json::Error> {
        record_row(<C as Record>::descriptor(), self)
    }

    fn nested(&mut self) -> Vec<ChildSet<'_>> {
        self.children()
    }
}

/// One named child collection borrowed from a parent record.
pub struct ChildSet<'a> {
    pub relation: &'static str,
    pub rows: Vec<&'a mut dyn ChildRow>,
}

impl<'a> ChildSet<'a> {
    pub fn new<C: ChildRecord>(relation: &'static str, items: &'a mut [C]) -> Self {
        ChildSet {
            relation,
            rows: items.iter_mut().map(|c| c as &mut dyn ChildRow).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serialize `value` and keep only the descriptor's persisted columns. The identifier and
/// relation collections are dropped; keys missing from the serialized form stay missing so
/// the backend applies its defaults.
pub fn record_row<S: Serialize + ?Sized>(
    descriptor: &RecordDescriptor,
    value: &S,
) -> Result<Row, serde_json::Error> {
    let mut row = Row::new();
    if let Value::Object(mut obj) = serde_json::to_value(value)? {
        for column in descriptor.columns {
            if let Some(v) = obj.remove(column.name) {
                row.insert(column.name.to_string(), v);
            }
        }
    }
    Ok(row)
}

/// Deserializer for patch fields over nullable columns: a missing key stays `None`
/// (with `#[serde(default)]`), an explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
