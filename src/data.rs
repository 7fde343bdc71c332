use crate::error::{PlotError, Result};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

/// A single cell. Ordering is total: `Null < Number < Text`, numbers by `total_cmp`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    /// Finite numbers only; NaN and infinities count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse a raw CSV cell: empty is null, numeric text is a number.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Null
        } else if let Ok(n) = trimmed.parse::<f64>() {
            Value::Number(n)
        } else {
            Value::Text(raw.to_string())
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Column-oriented table. Every column has the same number of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    headers: Vec<String>,
    columns: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset from named columns, rejecting ragged input.
    pub fn from_columns<S, I>(columns: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Vec<Value>)>,
    {
        let mut headers = Vec::new();
        let mut values = Vec::new();
        for (name, col) in columns {
            let name = name.into();
            if headers.contains(&name) {
                return Err(PlotError::InvalidData(format!("Duplicate column '{}'", name)));
            }
            headers.push(name);
            values.push(col);
        }

        if let Some(first) = values.first() {
            let n = first.len();
            if let Some(idx) = values.iter().position(|c| c.len() != n) {
                return Err(PlotError::InvalidData(format!(
                    "Column '{}' has {} rows, expected {}",
                    headers[idx],
                    values[idx].len(),
                    n
                )));
            }
        }

        Ok(Self { headers, columns: values })
    }

    /// Read a CSV with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| PlotError::InvalidData(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
        for (row_idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| {
                PlotError::InvalidData(format!("Failed to read CSV row {}: {}", row_idx + 1, e))
            })?;
            for (col, cell) in columns.iter_mut().zip(record.iter()) {
                col.push(Value::parse(cell));
            }
        }

        Self::from_columns(headers.into_iter().zip(columns))
    }

    /// Create a dataset from a JSON array of objects. Headers come from the first object.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| PlotError::InvalidData("Input data must be a JSON array of objects".to_string()))?;

        let first_obj = match array.first() {
            Some(first) => first
                .as_object()
                .ok_or_else(|| PlotError::InvalidData("Items in array must be objects".to_string()))?,
            None => return Ok(Self::default()),
        };

        let headers: Vec<String> = first_obj.keys().cloned().collect();
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(array.len()); headers.len()];

        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| PlotError::InvalidData("Items in array must be objects".to_string()))?;

            for (header, col) in headers.iter().zip(columns.iter_mut()) {
                let cell = match obj.get(header) {
                    Some(JsonValue::String(s)) => Value::Text(s.clone()),
                    Some(JsonValue::Number(n)) => n.as_f64().into(),
                    Some(JsonValue::Bool(b)) => Value::Text(b.to_string()),
                    Some(JsonValue::Null) | None => Value::Null,
                    _ => {
                        return Err(PlotError::InvalidData(format!(
                            "Unsupported value type for field '{}'",
                            header
                        )))
                    }
                };
                col.push(cell);
            }
        }

        Self::from_columns(headers.into_iter().zip(columns))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// Column values in row order. Exact name match wins over a case-insensitive one.
    pub fn column(&self, name: &str) -> Result<&[Value]> {
        self.find_column(name)
            .map(|idx| self.columns[idx].as_slice())
            .ok_or_else(|| PlotError::ColumnNotFound(name.to_string()))
    }

    fn find_column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
    }

    /// Keep only the rows whose indices are listed, in that order.
    pub fn filter_rows(&self, rows: &[usize]) -> Self {
        Self {
            headers: self.headers.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| rows.iter().map(|&r| col[r].clone()).collect())
                .collect(),
        }
    }

    /// Partition rows by the distinct values of `column`, ordered by key.
    pub fn group_by(&self, column: &str) -> Result<Vec<(Value, Dataset)>> {
        let keys = self.column(column)?;

        let mut groups: BTreeMap<&Value, Vec<usize>> = BTreeMap::new();
        for (row, key) in keys.iter().enumerate() {
            groups.entry(key).or_default().push(row);
        }

        Ok(groups
            .into_iter()
            .map(|(key, rows)| (key.clone(), self.filter_rows(&rows)))
            .collect())
    }

    /// Paired numeric values of two columns, skipping rows where either side is missing.
    pub fn numeric_pairs(&self, x: &str, y: &str) -> Result<Vec<(f64, f64)>> {
        let xs = self.column(x)?;
        let ys = self.column(y)?;
        Ok(xs
            .iter()
            .zip(ys)
            .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
            .collect())
    }

    /// Non-missing numeric values of one column.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<f64>> {
        Ok(self.column(column)?.iter().filter_map(Value::as_f64).collect())
    }
}
