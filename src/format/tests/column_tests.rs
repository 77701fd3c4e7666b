//! Tests for the `kind:name` column-key encoding.

use crate::format::ColumnKey;
use crate::model::{ClassificationField, FieldKind};

#[test]
fn test_encode() {
    let key = ColumnKey::new(FieldKind::Checkbox, "ich");
    assert_eq!(key.encode(), "checkbox:ich");

    let field = ClassificationField::new(FieldKind::FreeText, "comments", "Comments");
    assert_eq!(ColumnKey::for_field(&field).encode(), "freetext:comments");
}

#[test]
fn test_parse_roundtrip() {
    for spelling in ["checkbox:ich", "combobox:severity", "freetext:comments"] {
        let key = ColumnKey::parse(spelling).unwrap();
        assert_eq!(key.encode(), spelling);
    }
}

#[test]
fn test_parse_rejects_unknown_kind() {
    assert!(ColumnKey::parse("dropdown:severity").is_err());
    assert!(ColumnKey::parse("checkbox:").is_err());
    assert!(ColumnKey::parse("checkbox:a:b").is_err());
    assert!(ColumnKey::parse("Volume filename").is_err());
}

#[test]
fn test_parse_rejects_legacy_dict_spelling() {
    // The predecessor encoded headers as a printed Python dict and parsed
    // them back with eval(); that spelling is corruption here.
    assert!(ColumnKey::parse("{'ich': 'checkboxes'}").is_err());
}

#[test]
fn test_is_column_key() {
    assert!(ColumnKey::is_column_key("combobox:severity"));
    assert!(!ColumnKey::is_column_key("Annotator Name"));
    assert!(!ColumnKey::is_column_key("Date and time"));
}
