//! Version computation and history-table merging.
//!
//! Version numbers are always recomputed from the filesystem or table
//! snapshot handed in; there is no in-memory counter. That keeps numbering
//! correct across process restarts and multiple annotators sharing an
//! output folder, at the cost of being safe only when no two processes
//! write concurrently. No locking is attempted; concurrent writers may
//! produce colliding version numbers.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::error::Result;
use crate::format::{ColumnKey, CsvTable};
use crate::model::{ClassificationField, Label, VersionTag};

/// Marker written for a field that did not exist in the live schema when a
/// row was recorded. Distinct from an empty string, which means the field
/// existed and the user left it blank.
pub const ABSENT_MARKER: &str = "--";

/// Timestamp spelling of the `Date and time` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed leading columns of a segmentation history table.
pub const SEGMENTATION_FIXED_COLUMNS: [&str; 7] = [
    "Volume filename",
    "Segmentation version",
    "Annotator Name",
    "Annotator degree",
    "Revision step",
    "Date and time",
    "Duration",
];

/// Fixed leading columns of a classification history table.
pub const CLASSIFICATION_FIXED_COLUMNS: [&str; 7] = [
    "Volume filename",
    "Classification version",
    "Combobox version",
    "Annotator Name",
    "Annotator degree",
    "Revision step",
    "Date and time",
];

/// Column name of the classification version tag.
pub const CLASSIFICATION_VERSION_COLUMN: &str = "Classification version";

/// Column name of the recorded combobox-schema version tag.
pub const COMBOBOX_VERSION_COLUMN: &str = "Combobox version";

/// A named line measurement attached to a segmentation save.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMeasurement {
    /// User-assigned line name
    pub name: String,
    /// First control point (RAS coordinates)
    pub control_point1: [f64; 3],
    /// Second control point (RAS coordinates)
    pub control_point2: [f64; 3],
    /// Measured length
    pub length: f64,
}

/// One segmentation save, ready to be appended to the per-case history.
#[derive(Debug, Clone)]
pub struct SegmentationRecord {
    /// Case filename
    pub case: String,
    /// Version of the saved artifact
    pub version: VersionTag,
    /// Annotator identity
    pub annotator_name: String,
    /// Annotator degree
    pub annotator_degree: String,
    /// Revision step description
    pub revision_step: String,
    /// Wall-clock time of the save
    pub saved_at: NaiveDateTime,
    /// Total elapsed seconds for the save
    pub duration_secs: f64,
    /// Per-label elapsed seconds, in label-schema order
    pub label_durations: Vec<(String, f64)>,
    /// Line measurements keyed by user-assigned name
    pub lines: Vec<LineMeasurement>,
}

/// One classification save, ready to be merged into the per-case history.
#[derive(Debug, Clone)]
pub struct ClassificationRecord {
    /// Case filename
    pub case: String,
    /// Version of this classification
    pub version: VersionTag,
    /// Combobox-schema snapshot the form was rendered from
    pub combobox_version: Option<VersionTag>,
    /// Annotator identity
    pub annotator_name: String,
    /// Annotator degree
    pub annotator_degree: String,
    /// Revision step description
    pub revision_step: String,
    /// Wall-clock time of the save
    pub saved_at: NaiveDateTime,
    /// Raw field values entered by the user, in schema order
    pub values: Vec<(ClassificationField, String)>,
}

/// Computes next version identifiers and merges history rows without
/// destroying prior annotator data.
pub struct VersionLedger;

impl VersionLedger {
    /// Next segmentation version for a case, from the filenames of its
    /// existing versioned artifacts.
    ///
    /// `v01` when none exist; otherwise max + 1, saturating at `v99`. An
    /// unparseable filename fails with `MalformedVersionTag` instead of
    /// being guessed around.
    pub fn next_segmentation_version(existing_files: &[String]) -> Result<VersionTag> {
        let mut highest: Option<VersionTag> = None;
        for filename in existing_files {
            let tag = VersionTag::from_artifact_name(filename)?;
            highest = Some(highest.map_or(tag, |h| h.max(tag)));
        }
        Ok(highest.map_or(VersionTag::FIRST, |h| h.next()))
    }

    /// Next classification version from the existing per-case history
    /// table; `v01` when no table exists yet.
    pub fn next_classification_version(existing: Option<&CsvTable>) -> Result<VersionTag> {
        let Some(table) = existing else {
            return Ok(VersionTag::FIRST);
        };
        let mut highest: Option<VersionTag> = None;
        for value in table.column_values(CLASSIFICATION_VERSION_COLUMN)? {
            let tag: VersionTag = value.parse()?;
            highest = Some(highest.map_or(tag, |h| h.max(tag)));
        }
        Ok(highest.map_or(VersionTag::FIRST, |h| h.next()))
    }

    /// Append a segmentation row, recomputing the header from the current
    /// label schema.
    ///
    /// The header carries one `<label> duration` column per current label
    /// plus the union of line-measurement columns ever seen. Existing rows
    /// are preserved verbatim under the new header: data rows are immutable
    /// once written, only the header caption refreshes. The resulting file
    /// may therefore be ragged after a label-schema change.
    pub fn append_segmentation_row(
        existing: Option<CsvTable>,
        labels: &[Label],
        record: &SegmentationRecord,
    ) -> CsvTable {
        // Line-key union: keys already in the header, then new ones.
        let mut line_keys: Vec<String> = existing
            .as_ref()
            .map(|t| extract_line_keys(t.columns()))
            .unwrap_or_default();
        for line in &record.lines {
            if !line_keys.contains(&line.name) {
                line_keys.push(line.name.clone());
            }
        }

        let mut columns: Vec<String> = SEGMENTATION_FIXED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        for label in labels {
            columns.push(format!("{} duration", label.name));
        }
        for key in &line_keys {
            columns.push(format!("{key} ControlPoint1"));
            columns.push(format!("{key} ControlPoint2"));
            columns.push(format!("{key} Length"));
        }

        let mut row = vec![
            record.case.clone(),
            record.version.to_string(),
            record.annotator_name.clone(),
            record.annotator_degree.clone(),
            record.revision_step.clone(),
            record.saved_at.format(TIMESTAMP_FORMAT).to_string(),
            format_seconds(record.duration_secs),
        ];
        for label in labels {
            let duration = record
                .label_durations
                .iter()
                .find(|(name, _)| name == &label.name)
                .map(|(_, secs)| *secs)
                .unwrap_or(0.0);
            row.push(format_seconds(duration));
        }
        for key in &line_keys {
            match record.lines.iter().find(|l| &l.name == key) {
                Some(line) => {
                    row.push(join_point(&line.control_point1));
                    row.push(join_point(&line.control_point2));
                    row.push(format!("{}", line.length));
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }

        let mut table = match existing {
            Some(mut table) => {
                table.set_columns(columns);
                table
            }
            None => CsvTable::new(columns),
        };
        table.push_row(row);
        log::info!(
            "Appended segmentation row {} for '{}' ({} row(s) total)",
            record.version,
            record.case,
            table.row_count()
        );
        table
    }

    /// Merge a classification row into the existing table under the live
    /// schema.
    ///
    /// The merged table carries the union of all columns ever seen. Columns
    /// new to the table are backfilled with [`ABSENT_MARKER`] in prior
    /// rows; columns removed from the live schema get [`ABSENT_MARKER`] in
    /// the new row. Re-merging an already-merged table with the same schema
    /// adds no columns and changes no values.
    pub fn merge_classification_rows(
        existing: Option<CsvTable>,
        schema_fields: &[ClassificationField],
        record: &ClassificationRecord,
    ) -> Result<CsvTable> {
        if let Some(table) = &existing {
            table.check_rectangular()?;
        }

        // Union of columns: fixed, then the table's field columns in their
        // recorded order, then live-schema fields not yet present.
        let mut columns: Vec<String> = CLASSIFICATION_FIXED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        if let Some(table) = &existing {
            for column in table.columns() {
                if !columns.contains(column) {
                    // Any non-fixed column must be a parseable column key.
                    ColumnKey::parse(column)?;
                    columns.push(column.clone());
                }
            }
        }
        for field in schema_fields {
            let key = ColumnKey::for_field(field).encode();
            if !columns.contains(&key) {
                columns.push(key);
            }
        }

        // Re-project prior rows onto the union, backfilling new columns.
        let mut merged = CsvTable::new(columns.clone());
        if let Some(table) = &existing {
            for row_index in 0..table.row_count() {
                let row = columns
                    .iter()
                    .map(|column| {
                        table
                            .get(row_index, column)
                            .map(String::from)
                            .unwrap_or_else(|| ABSENT_MARKER.to_string())
                    })
                    .collect();
                merged.push_row(row);
            }
        }

        let mut values: IndexMap<String, String> = IndexMap::new();
        for (field, value) in &record.values {
            values.insert(ColumnKey::for_field(field).encode(), value.clone());
        }
        let live_keys: Vec<String> = schema_fields
            .iter()
            .map(|f| ColumnKey::for_field(f).encode())
            .collect();

        let new_row = columns
            .iter()
            .map(|column| {
                if let Some(fixed) = fixed_classification_cell(column, record) {
                    fixed
                } else if live_keys.contains(column) {
                    // Field exists in the live schema; missing input means
                    // the user left it blank.
                    values.get(column).cloned().unwrap_or_default()
                } else {
                    ABSENT_MARKER.to_string()
                }
            })
            .collect();
        merged.push_row(new_row);

        log::info!(
            "Merged classification row {} for '{}' ({} column(s))",
            record.version,
            record.case,
            merged.columns().len()
        );
        Ok(merged)
    }
}

/// Value of a fixed leading column for a classification record, or `None`
/// for field columns.
fn fixed_classification_cell(column: &str, record: &ClassificationRecord) -> Option<String> {
    match column {
        "Volume filename" => Some(record.case.clone()),
        CLASSIFICATION_VERSION_COLUMN => Some(record.version.to_string()),
        COMBOBOX_VERSION_COLUMN => Some(
            record
                .combobox_version
                .map(|v| v.to_string())
                .unwrap_or_else(|| ABSENT_MARKER.to_string()),
        ),
        "Annotator Name" => Some(record.annotator_name.clone()),
        "Annotator degree" => Some(record.annotator_degree.clone()),
        "Revision step" => Some(record.revision_step.clone()),
        "Date and time" => Some(record.saved_at.format(TIMESTAMP_FORMAT).to_string()),
        _ => None,
    }
}

/// Recover line-measurement keys from `<key> ControlPoint1` columns.
fn extract_line_keys(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter_map(|c| c.strip_suffix(" ControlPoint1"))
        .map(String::from)
        .collect()
}

/// One CSV cell per 3D point; coordinates join with semicolons so the point
/// stays in a single cell.
fn join_point(point: &[f64; 3]) -> String {
    format!("{};{};{}", point[0], point[1], point[2])
}

/// Seconds with no trailing zeros beyond what the float carries.
fn format_seconds(secs: f64) -> String {
    format!("{secs}")
}
