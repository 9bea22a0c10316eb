//! Typed property values exchanged between the generate orchestrator and
//! build extensions: scalars, lists and nested tables.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Table(ValueTable),
    List(Vec<Value>),
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Table(_) => "table",
            Value::List(_) => "list",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&ValueTable> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}
impl From<ValueTable> for Value {
    fn from(table: ValueTable) -> Self {
        Value::Table(table)
    }
}

/// A table of named values, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTable(BTreeMap<String, Value>);

fn wrong_type(key: &str, value: &Value, expected: &str) -> Error {
    Error::InvalidArgument(format!(
        "property {:?} is a {}, expected {}",
        key,
        value.type_name(),
        expected
    ))
}

fn missing(key: &str) -> Error {
    Error::InvalidArgument(format!("missing property {:?}", key))
}

impl ValueTable {
    pub fn new() -> Self {
        ValueTable::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, key: &str) -> Result<&Value> {
        self.get(key).ok_or_else(|| missing(key))
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| wrong_type(key, value, "string"))
    }

    pub fn get_integer(&self, key: &str) -> Result<i64> {
        let value = self.require(key)?;
        value
            .as_integer()
            .ok_or_else(|| wrong_type(key, value, "integer"))
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value.as_float().ok_or_else(|| wrong_type(key, value, "float"))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| wrong_type(key, value, "boolean"))
    }

    pub fn get_list(&self, key: &str) -> Result<&[Value]> {
        let value = self.require(key)?;
        value.as_list().ok_or_else(|| wrong_type(key, value, "list"))
    }

    pub fn get_table(&self, key: &str) -> Result<&ValueTable> {
        let value = self.require(key)?;
        value.as_table().ok_or_else(|| wrong_type(key, value, "table"))
    }

    /// A list of strings, e.g. a set of source files.
    pub fn get_string_list(&self, key: &str) -> Result<Vec<&str>> {
        self.get_list(key)?
            .iter()
            .map(|v| v.as_str().ok_or_else(|| wrong_type(key, v, "string")))
            .collect()
    }

    /// The table stored at `key`, created empty if absent.
    pub fn ensure_table(&mut self, key: &str) -> Result<&mut ValueTable> {
        let value = self
            .0
            .entry(key.to_owned())
            .or_insert_with(|| Value::Table(ValueTable::new()));
        match value {
            Value::Table(table) => Ok(table),
            other => Err(wrong_type(key, other, "table")),
        }
    }

    /// The list stored at `key`, created empty if absent.
    pub fn ensure_list(&mut self, key: &str) -> Result<&mut Vec<Value>> {
        let value = self
            .0
            .entry(key.to_owned())
            .or_insert_with(|| Value::List(Vec::new()));
        match value {
            Value::List(list) => Ok(list),
            other => Err(wrong_type(key, other, "list")),
        }
    }
}
