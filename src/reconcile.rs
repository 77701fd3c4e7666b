//! Reconciliation between recorded history and the live configuration.
//!
//! The classification schema drifts over a project's lifetime: fields come
//! and go, combobox option sets change. History rows are never rewritten to
//! match; instead this module resolves what a recorded row meant at the time
//! it was written, and cuts new combobox-schema snapshots so old rows keep a
//! resolvable schema version to point at.

use indexmap::IndexMap;

use crate::config::{ComboboxOptions, ComboboxSet, ConfigDocument};
use crate::error::{AnnotrackError, Result};
use crate::format::{ColumnKey, CsvTable};
use crate::ledger::{ABSENT_MARKER, CLASSIFICATION_VERSION_COLUMN, COMBOBOX_VERSION_COLUMN};
use crate::model::VersionTag;

/// A structural change to the combobox schema. Option-label edits are not
/// structural; see [`edit_combobox_option`].
#[derive(Debug, Clone)]
pub enum ComboboxChange {
    /// Add a combobox with its option set.
    Add {
        /// Combobox name
        name: String,
        /// Option key -> display label
        options: ComboboxOptions,
    },
    /// Remove a combobox.
    Remove {
        /// Combobox name
        name: String,
    },
}

/// Index of the history row carrying the given classification version.
pub fn find_classification_row(table: &CsvTable, version: VersionTag) -> Result<usize> {
    let values = table.column_values(CLASSIFICATION_VERSION_COLUMN)?;
    values
        .iter()
        .position(|v| *v == version.to_string())
        .ok_or_else(|| {
            AnnotrackError::invalid_table(format!(
                "no classification row with version {version}"
            ))
        })
}

/// The classification fields that existed in the live schema when the given
/// version was recorded.
///
/// A cell holding the absent marker means the field's column was added to
/// the table by a later save; such fields are excluded. An empty cell means
/// the field existed and was left blank, so it is included.
pub fn fields_present_in_history(table: &CsvTable, version: VersionTag) -> Result<Vec<ColumnKey>> {
    let row_index = find_classification_row(table, version)?;

    let mut present = Vec::new();
    for column in table.columns() {
        if !ColumnKey::is_column_key(column) {
            continue;
        }
        let cell = table.get(row_index, column).ok_or_else(|| {
            AnnotrackError::invalid_table(format!(
                "row {version} is missing a cell for column '{column}'"
            ))
        })?;
        if cell != ABSENT_MARKER {
            present.push(ColumnKey::parse(column)?);
        }
    }
    Ok(present)
}

/// Resolve the combobox option sets a recorded row was entered against.
///
/// `Ok(None)` when the row predates any combobox field (its cell holds the
/// absent marker). A recorded tag whose snapshot has since been deleted from
/// the configuration fails with `OrphanedSchemaVersion`; the row cannot be
/// re-displayed without that snapshot.
pub fn resolve_combobox_set_for_row<'a>(
    table: &CsvTable,
    version: VersionTag,
    config: &'a ConfigDocument,
) -> Result<Option<&'a ComboboxSet>> {
    let row_index = find_classification_row(table, version)?;
    let cell = table.get(row_index, COMBOBOX_VERSION_COLUMN).ok_or_else(|| {
        AnnotrackError::invalid_table(format!(
            "row {version} has no '{COMBOBOX_VERSION_COLUMN}' cell"
        ))
    })?;
    if cell == ABSENT_MARKER {
        return Ok(None);
    }
    let tag: VersionTag = cell.parse()?;
    config.combobox_set(tag).map(Some)
}

/// Cut a new combobox-schema snapshot by copying the latest one and applying
/// a structural change.
///
/// Existing snapshots are never touched; rows recorded against them keep
/// resolving. The first snapshot of a document starts from an empty set.
pub fn cut_new_combobox_version(
    doc: &mut ConfigDocument,
    change: &ComboboxChange,
) -> Result<VersionTag> {
    let mut set = doc.latest_combobox_set().cloned().unwrap_or_default();

    match change {
        ComboboxChange::Add { name, options } => {
            if set.contains_key(name) {
                return Err(AnnotrackError::invalid_config(format!(
                    "combobox '{name}' already exists"
                )));
            }
            set.insert(name.clone(), options.clone());
        }
        ComboboxChange::Remove { name } => {
            if set.shift_remove(name).is_none() {
                return Err(AnnotrackError::invalid_config(format!(
                    "no combobox named '{name}'"
                )));
            }
        }
    }

    let tag = doc
        .latest_combobox_version()
        .map_or(VersionTag::FIRST, |latest| latest.next());
    doc.comboboxes.insert(tag, set);
    log::info!("Cut combobox schema snapshot {tag}");
    Ok(tag)
}

/// Edit the display label of one option, in place, on the latest snapshot
/// only.
///
/// This does not change which options exist, so no new snapshot is cut.
pub fn edit_combobox_option(
    doc: &mut ConfigDocument,
    combobox: &str,
    option_key: &str,
    new_label: &str,
) -> Result<()> {
    let latest = doc.latest_combobox_version().ok_or_else(|| {
        AnnotrackError::invalid_config("no combobox schema snapshot exists".to_string())
    })?;
    let set = doc
        .comboboxes
        .get_mut(&latest)
        .ok_or(AnnotrackError::OrphanedSchemaVersion {
            version: latest.to_string(),
        })?;
    let options = set.get_mut(combobox).ok_or_else(|| {
        AnnotrackError::invalid_config(format!("no combobox named '{combobox}'"))
    })?;
    let label = options.get_mut(option_key).ok_or_else(|| {
        AnnotrackError::invalid_config(format!(
            "combobox '{combobox}' has no option '{option_key}'"
        ))
    })?;
    *label = new_label.to_string();
    Ok(())
}

/// Build an option set from `(key, label)` pairs. Test and bootstrap helper.
pub fn options_from_pairs(pairs: &[(&str, &str)]) -> ComboboxOptions {
    let mut options = IndexMap::new();
    for (key, label) in pairs {
        options.insert(key.to_string(), label.to_string());
    }
    options
}
