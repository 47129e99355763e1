use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{MitoQcError, Result};

/// Token written (and accepted) for a missing entry in flat files.
pub const NULL_TOKEN: &str = "NA";

///
/// Declared element type of an entry field. Every column of a
/// [crate::models::KeyedTable] carries one, so that a missing cell can be
/// materialised as a null of the right type.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Int32,
    Float64,
    Str,
}

impl Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Int32 => "int32",
            ElementType::Float64 => "float64",
            ElementType::Str => "str",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ElementType {
    type Err = MitoQcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "int" | "int32" => Ok(ElementType::Int32),
            "float" | "float64" => Ok(ElementType::Float64),
            "str" | "string" => Ok(ElementType::Str),
            _ => Err(MitoQcError::Parse(format!("Unknown element type: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int32(i32),
    Float64(f64),
    Str(String),
}

impl Value {
    pub fn element_type(&self) -> ElementType {
        match self {
            Value::Int32(_) => ElementType::Int32,
            Value::Float64(_) => ElementType::Float64,
            Value::Str(_) => ElementType::Str,
        }
    }

    /// Numeric view of the value; strings are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    ///
    /// Parse a raw flat-file token into a value of the given type.
    /// Empty tokens and [NULL_TOKEN] parse to a typed null (`None`).
    ///
    pub fn parse(raw: &str, element_type: ElementType) -> Result<Option<Value>> {
        let raw = raw.trim();
        if raw.is_empty() || raw == NULL_TOKEN {
            return Ok(None);
        }
        let value = match element_type {
            ElementType::Int32 => Value::Int32(raw.parse().map_err(|_| {
                MitoQcError::Parse(format!("Expected an int32 value, got: {}", raw))
            })?),
            ElementType::Float64 => Value::Float64(raw.parse().map_err(|_| {
                MitoQcError::Parse(format!("Expected a float64 value, got: {}", raw))
            })?),
            ElementType::Str => Value::Str(raw.to_string()),
        };
        Ok(Some(value))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

///
/// The values of one entry field for one sample column, aligned with the
/// row keys of the owning table. The variant fixes the element type, so a
/// null pushed into an `Int32` column is an int32 null.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Int32(Vec<Option<i32>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
}

impl ColumnData {
    pub fn with_capacity(element_type: ElementType, capacity: usize) -> Self {
        match element_type {
            ElementType::Int32 => ColumnData::Int32(Vec::with_capacity(capacity)),
            ElementType::Float64 => ColumnData::Float64(Vec::with_capacity(capacity)),
            ElementType::Str => ColumnData::Str(Vec::with_capacity(capacity)),
        }
    }

    /// A column of `len` typed nulls.
    pub fn nulls(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Int32 => ColumnData::Int32(vec![None; len]),
            ElementType::Float64 => ColumnData::Float64(vec![None; len]),
            ElementType::Str => ColumnData::Str(vec![None; len]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ColumnData::Int32(_) => ElementType::Int32,
            ColumnData::Float64(_) => ElementType::Float64,
            ColumnData::Str(_) => ElementType::Str,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<Value> {
        match self {
            ColumnData::Int32(v) => v.get(idx).copied().flatten().map(Value::Int32),
            ColumnData::Float64(v) => v.get(idx).copied().flatten().map(Value::Float64),
            ColumnData::Str(v) => v.get(idx).cloned().flatten().map(Value::Str),
        }
    }

    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        match self {
            ColumnData::Int32(v) => v.get(idx).copied().flatten().map(|x| x as f64),
            ColumnData::Float64(v) => v.get(idx).copied().flatten(),
            ColumnData::Str(_) => None,
        }
    }

    pub fn get_i32(&self, idx: usize) -> Option<i32> {
        match self {
            ColumnData::Int32(v) => v.get(idx).copied().flatten(),
            _ => None,
        }
    }

    /// An index past the end reads as null, like [ColumnData::get].
    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            ColumnData::Int32(v) => v.get(idx).is_none_or(Option::is_none),
            ColumnData::Float64(v) => v.get(idx).is_none_or(Option::is_none),
            ColumnData::Str(v) => v.get(idx).is_none_or(Option::is_none),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    ///
    /// Append a value, checking it against the column's element type.
    ///
    pub fn push(&mut self, value: Option<Value>) -> Result<()> {
        match (self, value) {
            (ColumnData::Int32(v), None) => v.push(None),
            (ColumnData::Float64(v), None) => v.push(None),
            (ColumnData::Str(v), None) => v.push(None),
            (ColumnData::Int32(v), Some(Value::Int32(x))) => v.push(Some(x)),
            (ColumnData::Float64(v), Some(Value::Float64(x))) => v.push(Some(x)),
            (ColumnData::Float64(v), Some(Value::Int32(x))) => v.push(Some(x as f64)),
            (ColumnData::Str(v), Some(Value::Str(x))) => v.push(Some(x)),
            (column, Some(value)) => {
                return Err(MitoQcError::SchemaMismatch(format!(
                    "Cannot store a {} value in a {} column",
                    value.element_type(),
                    column.element_type()
                )));
            }
        }
        Ok(())
    }

    ///
    /// Gather values by source index; `None` produces a typed null. This is
    /// the primitive behind outer joins: the output is aligned to a new row
    /// order, and rows the source never had come out null.
    ///
    pub fn gather(&self, indices: &[Option<usize>]) -> Self {
        match self {
            ColumnData::Int32(v) => {
                ColumnData::Int32(indices.iter().map(|i| i.and_then(|i| v[i])).collect())
            }
            ColumnData::Float64(v) => {
                ColumnData::Float64(indices.iter().map(|i| i.and_then(|i| v[i])).collect())
            }
            ColumnData::Str(v) => ColumnData::Str(
                indices
                    .iter()
                    .map(|i| i.and_then(|i| v[i].clone()))
                    .collect(),
            ),
        }
    }

    /// Keep only the given source indices, in order.
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            ColumnData::Int32(v) => ColumnData::Int32(indices.iter().map(|&i| v[i]).collect()),
            ColumnData::Float64(v) => {
                ColumnData::Float64(indices.iter().map(|&i| v[i]).collect())
            }
            ColumnData::Str(v) => {
                ColumnData::Str(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Flat-file token for one entry.
    pub fn format(&self, idx: usize) -> String {
        match self.get(idx) {
            Some(value) => value.to_string(),
            None => NULL_TOKEN.to_string(),
        }
    }
}
