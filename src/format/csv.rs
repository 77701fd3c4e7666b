//! Minimal CSV reader/writer for history tables.
//!
//! Handles quoting for cells containing commas, quotes or newlines
//! (freetext values need it). Rows keep their own length: segmentation
//! history files are intentionally ragged, because a header rewrite after a
//! label-schema change never reformats previously written rows.

use std::path::Path;

use crate::error::{AnnotrackError, Result};

/// An in-memory CSV table with a header row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Create an empty table with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Parse CSV text. The first record is the header; an empty input is a
    /// corruption signal.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut records = parse_records(text)?;
        if records.is_empty() {
            return Err(AnnotrackError::invalid_table("empty file"));
        }
        let columns = records.remove(0);
        Ok(Self {
            columns,
            rows: records,
        })
    }

    /// Serialize to CSV text with a trailing newline.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.columns);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }

    /// Load a table from a file, or `None` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        let table = Self::from_csv(&text)?;
        log::debug!(
            "Loaded {} rows from {:?}",
            table.row_count(),
            path.file_name().unwrap_or_default()
        );
        Ok(Some(table))
    }

    /// Write the table to a file, replacing prior content.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_csv())?;
        Ok(())
    }

    /// Header cells.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Replace the header, keeping data rows verbatim.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    /// Data rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Mutable data rows.
    pub fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Append a data row.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Index of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at (row, column name), if both exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// All values of a named column; fails when the column is absent,
    /// because callers ask for columns the format guarantees.
    pub fn column_values(&self, name: &str) -> Result<Vec<&str>> {
        let col = self.column_index(name).ok_or_else(|| {
            AnnotrackError::invalid_table(format!("missing column '{name}'"))
        })?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(col).map(String::as_str).unwrap_or(""))
            .collect())
    }

    /// Verify that every data row has exactly one cell per header column.
    /// Classification tables require this; segmentation tables do not.
    pub fn check_rectangular(&self) -> Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(AnnotrackError::invalid_table(format!(
                    "row {} has {} cells, header has {}",
                    i + 1,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }
}

/// Parse CSV text into records, honoring quoted cells.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    let mut any_content = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        cell.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                any_content = true;
            }
            ',' => {
                record.push(std::mem::take(&mut cell));
                any_content = true;
            }
            '\r' => {
                // Swallow; the \n that follows ends the record
            }
            '\n' => {
                if any_content || !cell.is_empty() {
                    record.push(std::mem::take(&mut cell));
                    records.push(std::mem::take(&mut record));
                }
                any_content = false;
            }
            _ => {
                cell.push(c);
                any_content = true;
            }
        }
    }

    if in_quotes {
        return Err(AnnotrackError::invalid_table("unterminated quoted cell"));
    }
    if any_content || !cell.is_empty() {
        record.push(cell);
        records.push(record);
    }

    Ok(records)
}

/// Append one CSV record (with trailing newline) to `out`.
fn write_record(out: &mut String, cells: &[String]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}
