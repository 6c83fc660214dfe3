//! Record types exchanged with the host persistence layer.
//!
//! The store hands rows to the interceptor and receives them back in the same
//! shape; nothing in this crate performs I/O.

use serde_json::{Map, Value};

/// One entity instance as a key → value mapping.
pub type Record = Map<String, Value>;

/// Rows returned by the store from a load operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Rows {
    /// The lookup matched nothing.
    #[default]
    Empty,
    /// A single-record lookup.
    One(Record),
    /// A list lookup; order is significant.
    Many(Vec<Record>),
}

impl Rows {
    /// Number of records carried.
    pub fn len(&self) -> usize {
        match self {
            Rows::Empty => 0,
            Rows::One(_) => 1,
            Rows::Many(list) => list.len(),
        }
    }

    /// Returns `true` if no records are carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into a list, preserving order.
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            Rows::Empty => Vec::new(),
            Rows::One(record) => vec![record],
            Rows::Many(list) => list,
        }
    }
}

impl From<Record> for Rows {
    fn from(record: Record) -> Self {
        Rows::One(record)
    }
}

impl From<Option<Record>> for Rows {
    fn from(record: Option<Record>) -> Self {
        record.map_or(Rows::Empty, Rows::One)
    }
}

impl From<Vec<Record>> for Rows {
    fn from(list: Vec<Record>) -> Self {
        Rows::Many(list)
    }
}

/// Convert a JSON object literal into a [`Record`], or `None` if it is not an object.
pub fn record_from_value(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
