//! Column-key encoding for classification history headers.
//!
//! Classification field columns are encoded as `kind:name` (for example
//! `checkbox:ich` or `freetext:comments`). The encoding is parsed with a
//! dedicated tokenizer; it is never handed to a general-purpose expression
//! evaluator. Fixed leading columns (`Volume filename`, ...) are not column
//! keys.

use std::fmt;

use crate::error::{AnnotrackError, Result};
use crate::model::{ClassificationField, FieldKind};

/// The `kind:name` identity of a classification column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    /// Field kind
    pub kind: FieldKind,
    /// Internal field name
    pub name: String,
}

impl ColumnKey {
    /// Create a column key.
    pub fn new(kind: FieldKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }

    /// The column key of a live schema field.
    pub fn for_field(field: &ClassificationField) -> Self {
        Self::new(field.kind, &field.name)
    }

    /// Serialize to the `kind:name` header spelling.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.kind.token(), self.name)
    }

    /// Tokenize a `kind:name` header.
    ///
    /// Exactly one `:` separator, a known kind token, and a non-empty name
    /// are required; anything else fails with `MalformedColumnKey`.
    pub fn parse(column: &str) -> Result<ColumnKey> {
        let mut parts = column.splitn(2, ':');
        let kind_token = parts.next().unwrap_or("");
        let name = parts.next().ok_or_else(|| AnnotrackError::MalformedColumnKey {
            column: column.to_string(),
        })?;

        let kind = FieldKind::from_token(kind_token).ok_or_else(|| {
            AnnotrackError::MalformedColumnKey {
                column: column.to_string(),
            }
        })?;

        if name.is_empty() || name.contains(':') {
            return Err(AnnotrackError::MalformedColumnKey {
                column: column.to_string(),
            });
        }

        Ok(ColumnKey::new(kind, name))
    }

    /// Whether a header cell looks like a column key at all (used to tell
    /// field columns apart from fixed leading columns).
    pub fn is_column_key(column: &str) -> bool {
        Self::parse(column).is_ok()
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
