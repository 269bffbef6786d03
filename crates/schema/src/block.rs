//! Columnar batch handed to the sink in one insert

/// Values of a single column, one entry per row
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Millisecond-precision instant (epoch millis)
    DateTime64Millis(Vec<i64>),
    String(Vec<String>),
    Float64(Vec<f64>),
    NullableFloat64(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::DateTime64Millis(v) => v.len(),
            ColumnData::String(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::NullableFloat64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column type as the sink's DDL names it
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::DateTime64Millis(_) => "DateTime64(3)",
            ColumnData::String(_) => "String",
            ColumnData::Float64(_) => "Float64",
            ColumnData::NullableFloat64(_) => "Nullable(Float64)",
        }
    }

    pub fn as_timestamps(&self) -> Option<&[i64]> {
        match self {
            ColumnData::DateTime64Millis(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ColumnData::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_nullable_f64(&self) -> Option<&[Option<f64>]> {
        match self {
            ColumnData::NullableFloat64(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub data: ColumnData,
}

/// Rows for one table laid out column by column
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub table: &'static str,
    pub columns: Vec<Column>,
}

impl Block {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    pub fn append_column(&mut self, name: &'static str, data: ColumnData) {
        self.columns.push(Column { name, data });
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Row count; columns always have equal length
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}
