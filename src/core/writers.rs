//! Table output: CSV files and console rendering.

use std::fmt::Write as _;
use std::fs;
use std::io::BufWriter;
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

use super::table::ResultTable;

/// Rows shown at each end of an elided console table.
const ELIDED_EDGE_ROWS: usize = 5;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Format a sample for CSV output.
///
/// Missing samples (`NaN`) become empty cells and integral values keep a
/// trailing `.0`, matching a typical dataframe export.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn display_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format_value(value)
    }
}

/// Write a result table to CSV.
///
/// The header row holds the column names (datasets first, `Time` last),
/// followed by one row per segment. No row index is written. Rows go to a
/// temporary file next to `path` that replaces it only once complete, so a
/// failed write leaves any existing file untouched.
///
/// # Errors
///
/// Returns an error if:
/// - Parent directories cannot be created
/// - File cannot be created or written to
///
/// # Example
///
/// ```no_run
/// use motan_log::core::table::ResultTable;
/// use motan_log::core::writers::write_table_csv;
/// use std::path::Path;
///
/// let table = ResultTable::new(vec![("a".to_string(), vec![1.0])], vec![0.1]).unwrap();
/// write_table_csv(Path::new("out.csv"), &table).unwrap();
/// ```
pub fn write_table_csv(path: &Path, table: &ResultTable) -> Result<()> {
    ensure_parent_dirs(path)?;

    let path_str = path.display().to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;

    {
        let buf_writer = BufWriter::new(tmp.as_file_mut());
        let mut csv_writer = csv::Writer::from_writer(buf_writer);

        csv_writer
            .write_record(table.column_names())
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;

        let columns = table.columns();
        let mut record: Vec<String> = Vec::with_capacity(columns.len());
        for row in 0..table.num_rows() {
            record.clear();
            record.extend(columns.iter().map(|c| format_value(c.values[row])));
            csv_writer
                .write_record(&record)
                .map_err(|e| WriteError::CsvError {
                    path: path_str.clone(),
                    source: e,
                })?;
        }

        csv_writer.flush().map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })?;
    }

    tmp.persist(path).map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e.error,
    })?;

    Ok(())
}

/// Render a result table for the console.
///
/// Columns are right-aligned behind a row index. Tables longer than
/// `max_rows` show only their first and last five rows.
pub fn render_table(table: &ResultTable, max_rows: usize) -> String {
    let names = table.column_names();
    let mut out = String::new();

    if table.is_empty() {
        let _ = writeln!(out, "Empty table");
        let _ = writeln!(out, "Columns: [{}]", names.join(", "));
        let _ = write!(out, "Index: []");
        return out;
    }

    let num_rows = table.num_rows();
    let elide = num_rows > max_rows && num_rows > 2 * ELIDED_EDGE_ROWS;
    let shown: Vec<Option<usize>> = if elide {
        (0..ELIDED_EDGE_ROWS)
            .map(Some)
            .chain(std::iter::once(None))
            .chain((num_rows - ELIDED_EDGE_ROWS..num_rows).map(Some))
            .collect()
    } else {
        (0..num_rows).map(Some).collect()
    };

    // Cells per displayed line; `None` rows render as "..."
    let columns = table.columns();
    let mut index_cells = Vec::with_capacity(shown.len());
    let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(shown.len()); columns.len()];
    for row in &shown {
        match row {
            Some(r) => {
                index_cells.push(r.to_string());
                for (col, column) in columns.iter().enumerate() {
                    cells[col].push(display_value(column.values[*r]));
                }
            }
            None => {
                index_cells.push("...".to_string());
                for col_cells in cells.iter_mut() {
                    col_cells.push("...".to_string());
                }
            }
        }
    }

    let index_width = index_cells.iter().map(|c| c.len()).max().unwrap_or(0);
    let widths: Vec<usize> = names
        .iter()
        .zip(cells.iter())
        .map(|(name, col)| {
            col.iter()
                .map(|c| c.len())
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let _ = write!(out, "{:width$}", "", width = index_width);
    for (name, width) in names.iter().zip(&widths) {
        let _ = write!(out, "  {:>width$}", name, width = *width);
    }
    out.push('\n');

    for (line, index) in index_cells.iter().enumerate() {
        let _ = write!(out, "{:<width$}", index, width = index_width);
        for (col, width) in widths.iter().enumerate() {
            let _ = write!(out, "  {:>width$}", cells[col][line], width = *width);
        }
        out.push('\n');
    }

    if elide {
        let _ = write!(out, "\n[{} rows x {} columns]", num_rows, table.num_columns());
    } else {
        out.pop();
    }

    out
}
