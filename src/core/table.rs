//! Time-aligned result table.

use thiserror::Error;

/// Name of the reserved time axis column.
pub const TIME_COLUMN: &str = "Time";

/// Errors raised when assembling a table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// A named column of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Dataset columns followed by the `Time` column, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    columns: Vec<Column>,
    num_rows: usize,
}

impl ResultTable {
    /// Assemble a table from per-dataset series and the shared time axis.
    ///
    /// Dataset columns keep the order given; `Time` is appended last. Every
    /// series must have exactly as many values as `times`.
    pub fn new<I>(series: I, times: Vec<f64>) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let num_rows = times.len();
        let mut columns: Vec<Column> = Vec::new();

        for (name, values) in series {
            if values.len() != num_rows {
                return Err(TableError::LengthMismatch {
                    column: name,
                    expected: num_rows,
                    actual: values.len(),
                });
            }
            if name == TIME_COLUMN || columns.iter().any(|c| c.name == name) {
                return Err(TableError::DuplicateColumn(name));
            }
            columns.push(Column { name, values });
        }

        columns.push(Column {
            name: TIME_COLUMN.to_string(),
            values: times,
        });

        Ok(Self { columns, num_rows })
    }

    /// All columns, `Time` last.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in output order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// The time axis.
    pub fn times(&self) -> &[f64] {
        // Time is always present as the last column.
        self.columns
            .last()
            .map(|c| c.values.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Values of every column at `row`, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.num_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[row]).collect())
    }
}
