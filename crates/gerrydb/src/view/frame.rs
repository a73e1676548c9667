//! Tabular form of a view.

use geo_types::{Geometry, Point};
use indexmap::IndexMap;
use serde::Serialize;

use super::payload::{PayloadError, RenderedUnit, RenderedView, parse_wkt};
use crate::models::{Column, ColumnType};

/// A column value typed per the column's declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(serde_json::Value),
}

impl ColumnValue {
    /// Type `value` as `column_type`.
    ///
    /// Integral floats are accepted as ints and ints as floats.
    fn typed(value: &serde_json::Value, column_type: ColumnType) -> Option<Self> {
        use serde_json::Value;

        let typed = match (column_type, value) {
            (_, Value::Null) => ColumnValue::Null,
            (ColumnType::Json, value) => ColumnValue::Json(value.clone()),
            (ColumnType::Bool, Value::Bool(value)) => ColumnValue::Bool(*value),
            (ColumnType::Str, Value::String(value)) => ColumnValue::Str(value.clone()),
            (ColumnType::Float, Value::Number(number)) => ColumnValue::Float(number.as_f64()?),
            (ColumnType::Int, Value::Number(number)) => match number.as_i64() {
                Some(value) => ColumnValue::Int(value),
                None => {
                    let value = number.as_f64()?;
                    if value.fract() != 0.0 || value.abs() >= i64::MAX as f64 {
                        return None;
                    }
                    ColumnValue::Int(value as i64)
                },
            },
            _ => return None,
        };
        Some(typed)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Numeric value, used for tallies.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int(value) => Some(*value as f64),
            ColumnValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Str(value) => Some(value),
            _ => None,
        }
    }
}

/// A geographic unit of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub geography: Option<Geometry<f64>>,
    pub internal_point: Option<Point<f64>>,
    /// Values in the order of [ViewFrame::columns].
    pub values: Vec<ColumnValue>,
}

/// A table of a view's units keyed by unit identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewFrame {
    columns: Vec<Column>,
    units: IndexMap<String, Unit>,
}

impl ViewFrame {
    /// Build a table with `columns` from a render.
    pub(crate) fn from_render(
        columns: Vec<Column>,
        render: &RenderedView,
    ) -> Result<Self, PayloadError> {
        let mut units = IndexMap::with_capacity(render.units.len());
        for rendered in &render.units {
            let unit = decode_unit(&columns, rendered)?;
            if units.insert(rendered.path.clone(), unit).is_some() {
                return Err(PayloadError::DuplicateUnit(rendered.path.clone()));
            }
        }
        Ok(Self { columns, units })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|candidate| candidate.canonical_path == column)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn unit(&self, unit: &str) -> Option<&Unit> {
        self.units.get(unit)
    }

    /// The value of `column` for `unit`.
    pub fn value(&self, unit: &str, column: &str) -> Option<&ColumnValue> {
        let index = self.column_index(column)?;
        self.units.get(unit).map(|unit| &unit.values[index])
    }

    /// Units in render order.
    pub fn units(&self) -> impl Iterator<Item = (&str, &Unit)> {
        self.units.iter().map(|(path, unit)| (path.as_str(), unit))
    }

    pub(crate) fn into_parts(self) -> (Vec<Column>, IndexMap<String, Unit>) {
        (self.columns, self.units)
    }
}

fn decode_unit(columns: &[Column], rendered: &RenderedUnit) -> Result<Unit, PayloadError> {
    let geography = rendered
        .geography
        .as_deref()
        .map(|wkt| parse_wkt(&rendered.path, wkt))
        .transpose()?;
    let internal_point = rendered
        .internal_point
        .as_deref()
        .map(|wkt| {
            parse_wkt(&rendered.path, wkt).and_then(|geometry| {
                Point::try_from(geometry).map_err(|e| PayloadError::Geometry {
                    unit: rendered.path.clone(),
                    message: e.to_string(),
                })
            })
        })
        .transpose()?;

    let values = columns
        .iter()
        .map(|column| {
            let Some(value) = rendered.values.get(&column.canonical_path) else {
                return Ok(ColumnValue::Null);
            };
            ColumnValue::typed(value, column.column_type).ok_or_else(|| PayloadError::ColumnType {
                unit: rendered.path.clone(),
                column: column.canonical_path.clone(),
                expected: column.column_type,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Unit {
        geography,
        internal_point,
        values,
    })
}
