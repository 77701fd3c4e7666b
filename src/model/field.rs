//! Classification field descriptors.
//!
//! Fields are carried as typed data (kind, internal name, display label)
//! rather than inferred from string parsing of column names; conversion to
//! and from the textual column-name convention happens only at the I/O
//! boundary (see `format::column`).

use serde::{Deserialize, Serialize};

/// The kind of a classification data-entry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// A boolean checkbox
    Checkbox,
    /// A dropdown with a versioned option set
    Combobox,
    /// A free-text entry field
    FreeText,
}

impl FieldKind {
    /// The token used in the `kind:name` column encoding.
    pub fn token(&self) -> &'static str {
        match self {
            FieldKind::Checkbox => "checkbox",
            FieldKind::Combobox => "combobox",
            FieldKind::FreeText => "freetext",
        }
    }

    /// Parse a column-encoding token back into a kind.
    pub fn from_token(token: &str) -> Option<FieldKind> {
        match token {
            "checkbox" => Some(FieldKind::Checkbox),
            "combobox" => Some(FieldKind::Combobox),
            "freetext" => Some(FieldKind::FreeText),
            _ => None,
        }
    }
}

/// A classification field in the live schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationField {
    /// Field kind
    pub kind: FieldKind,
    /// Internal name, unique within its kind
    pub name: String,
    /// Display label shown in the data-entry form
    pub label: String,
}

impl ClassificationField {
    /// Create a new field descriptor.
    pub fn new(kind: FieldKind, name: &str, label: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            label: label.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_token_roundtrip() {
        for kind in [FieldKind::Checkbox, FieldKind::Combobox, FieldKind::FreeText] {
            assert_eq!(FieldKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(FieldKind::from_token("dropdown"), None);
    }
}
