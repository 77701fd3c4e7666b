//! Project configuration: label schema, classification schema and behavior
//! flags.
//!
//! The configuration is a single YAML document. [`ConfigStore`] is the only
//! way to read or write it; consumers receive the store by reference instead
//! of going through ambient globals, so unit tests can construct independent
//! stores.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{AnnotrackError, Result};
use crate::model::{ClassificationField, FieldKind, Label, Modality, VersionTag};

/// Option set of one combobox: option key -> display label.
pub type ComboboxOptions = IndexMap<String, String>;

/// One combobox-schema snapshot: combobox name -> option set.
pub type ComboboxSet = IndexMap<String, ComboboxOptions>;

/// The project configuration document.
///
/// Missing optional sections (for example no freetext boxes) deserialize as
/// empty; structural violations are surfaced by [`ConfigDocument::validate`],
/// never papered over with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Segmentation labels; `value` fields are contiguous `1..=N` in list
    /// order.
    pub labels: Vec<Label>,

    /// Checkbox fields: internal name -> display label.
    #[serde(default)]
    pub checkboxes: IndexMap<String, String>,

    /// Combobox-schema snapshots keyed by version tag. Snapshots are
    /// append-only; see `reconcile::cut_new_combobox_version`.
    #[serde(default)]
    pub comboboxes: IndexMap<VersionTag, ComboboxSet>,

    /// Free-text fields: internal name -> display label.
    #[serde(default)]
    pub freetextboxes: IndexMap<String, String>,

    /// Imaging modality of the project.
    #[serde(default)]
    pub modality: Modality,

    /// Whether case discovery enforces BIDS-style naming.
    #[serde(default)]
    pub impose_bids_format: bool,

    /// Filename extension of input volumes.
    #[serde(default = "default_input_filetype")]
    pub input_filetype: String,

    /// Default volume-display interpolation toggle.
    #[serde(default)]
    pub interpolate_value: bool,

    /// Whether the elapsed-time display is shown during annotation.
    #[serde(default)]
    pub is_display_timer_requested: bool,

    /// CT display window level.
    #[serde(default = "default_ct_window_level")]
    pub ct_window_level: i32,

    /// CT display window width.
    #[serde(default = "default_ct_window_width")]
    pub ct_window_width: i32,

    /// Slice view highlight color.
    #[serde(default = "default_slice_view_color")]
    pub slice_view_color: String,

    /// Keyboard shortcut bindings: action name -> key.
    #[serde(default)]
    pub keyboard_shortcuts: IndexMap<String, String>,
}

fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(':') {
        return Err(AnnotrackError::invalid_config(format!(
            "classification field name '{name}' is invalid; names are non-empty and contain no ':'"
        )));
    }
    Ok(())
}

fn default_input_filetype() -> String {
    ".nii.gz".to_string()
}

fn default_ct_window_level() -> i32 {
    45
}

fn default_ct_window_width() -> i32 {
    85
}

fn default_slice_view_color() -> String {
    "Yellow".to_string()
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            labels: vec![Label::new(1, "ICH", [255, 10, 10]).with_hu_bounds(30, 90)],
            checkboxes: IndexMap::new(),
            comboboxes: IndexMap::new(),
            freetextboxes: IndexMap::new(),
            modality: Modality::Ct,
            impose_bids_format: false,
            input_filetype: default_input_filetype(),
            interpolate_value: false,
            is_display_timer_requested: false,
            ct_window_level: default_ct_window_level(),
            ct_window_width: default_ct_window_width(),
            slice_view_color: default_slice_view_color(),
            keyboard_shortcuts: IndexMap::new(),
        }
    }
}

impl ConfigDocument {
    /// Check the structural invariants: at least one label, contiguous
    /// `1..=N` values matching list order, unique label names without
    /// spaces, and classification field names that survive the `kind:name`
    /// column encoding.
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(AnnotrackError::EmptyLabelSchema);
        }
        for (i, label) in self.labels.iter().enumerate() {
            let expected = (i + 1) as u8;
            if label.value != expected {
                return Err(AnnotrackError::invalid_config(format!(
                    "label '{}' has value {}, expected {} from its position",
                    label.name, label.value, expected
                )));
            }
            if label.name.is_empty() || label.name.contains(' ') {
                return Err(AnnotrackError::invalid_config(format!(
                    "label name '{}' is invalid; names are non-empty and contain no spaces",
                    label.name
                )));
            }
            if self.labels[..i].iter().any(|l| l.name == label.name) {
                return Err(AnnotrackError::invalid_config(format!(
                    "duplicate label name '{}'",
                    label.name
                )));
            }
        }

        // Field names become `kind:name` history column headers; a name the
        // column tokenizer rejects would poison every later merge of the
        // case's own history file.
        let combobox_names = self.comboboxes.values().flat_map(|set| set.keys());
        for name in self
            .checkboxes
            .keys()
            .chain(self.freetextboxes.keys())
            .chain(combobox_names)
        {
            validate_field_name(name)?;
        }
        Ok(())
    }

    /// The numerically-highest combobox snapshot tag, or `None` when no
    /// snapshot has been cut yet.
    pub fn latest_combobox_version(&self) -> Option<VersionTag> {
        self.comboboxes.keys().copied().max()
    }

    /// Option sets of the latest combobox snapshot.
    pub fn latest_combobox_set(&self) -> Option<&ComboboxSet> {
        let latest = self.latest_combobox_version()?;
        self.comboboxes.get(&latest)
    }

    /// Option sets of a specific snapshot; `OrphanedSchemaVersion` when the
    /// tag has been deleted from the document.
    pub fn combobox_set(&self, version: VersionTag) -> Result<&ComboboxSet> {
        self.comboboxes
            .get(&version)
            .ok_or_else(|| AnnotrackError::OrphanedSchemaVersion {
                version: version.to_string(),
            })
    }

    /// The live classification field set, in config order: checkboxes, then
    /// the latest combobox snapshot, then free-text fields.
    pub fn classification_fields(&self) -> Vec<ClassificationField> {
        let mut fields = Vec::new();
        for (name, label) in &self.checkboxes {
            fields.push(ClassificationField::new(FieldKind::Checkbox, name, label));
        }
        if let Some(set) = self.latest_combobox_set() {
            for name in set.keys() {
                fields.push(ClassificationField::new(FieldKind::Combobox, name, name));
            }
        }
        for (name, label) in &self.freetextboxes {
            fields.push(ClassificationField::new(FieldKind::FreeText, name, label));
        }
        fields
    }

    /// Remove the label carrying `value` and renumber every higher value
    /// down by one.
    ///
    /// Refuses with `EmptyLabelSchema` when the removal would empty the
    /// list, leaving the document unchanged.
    pub fn remove_label(&mut self, value: u8) -> Result<()> {
        if self.labels.len() <= 1 {
            return Err(AnnotrackError::EmptyLabelSchema);
        }
        let index = self
            .labels
            .iter()
            .position(|l| l.value == value)
            .ok_or_else(|| {
                AnnotrackError::invalid_config(format!("no label with value {value}"))
            })?;
        let removed = self.labels.remove(index);
        for label in &mut self.labels {
            if label.value > value {
                label.value -= 1;
            }
        }
        log::info!("Removed label '{}' (value {})", removed.name, value);
        Ok(())
    }

    /// Append a label at the end of the list with `value = N + 1`.
    pub fn add_label(&mut self, name: &str, color: [u8; 3]) -> Result<&mut Label> {
        if name.is_empty() || name.contains(' ') {
            return Err(AnnotrackError::invalid_config(format!(
                "label name '{name}' is invalid; names are non-empty and contain no spaces"
            )));
        }
        if self.labels.iter().any(|l| l.name == name) {
            return Err(AnnotrackError::invalid_config(format!(
                "duplicate label name '{name}'"
            )));
        }
        let value = (self.labels.len() + 1) as u8;
        self.labels.push(Label::new(value, name, color));
        log::info!("Added label '{name}' (value {value})");
        Ok(self.labels.last_mut().expect("label was just pushed"))
    }
}

/// The set of classification-schema fields added, removed or renamed
/// between two configuration documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDelta {
    /// Fields present after but not before.
    pub added: Vec<ClassificationField>,
    /// Fields present before but not after.
    pub removed: Vec<ClassificationField>,
    /// Fields whose display label changed (same kind and internal name).
    pub renamed: Vec<ClassificationField>,
}

impl SchemaDelta {
    /// Whether the delta is empty.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.renamed.is_empty()
    }

    /// Whether a new combobox-schema snapshot must be cut. Only a combobox
    /// field appearing or disappearing triggers this; label edits and
    /// checkbox/freetext changes do not.
    pub fn requires_new_combobox_version(&self) -> bool {
        self.added
            .iter()
            .chain(self.removed.iter())
            .any(|f| f.kind == FieldKind::Combobox)
    }
}

/// Compare the classification field sets of two documents.
pub fn diff_classification_schema(before: &ConfigDocument, after: &ConfigDocument) -> SchemaDelta {
    let before_fields = before.classification_fields();
    let after_fields = after.classification_fields();

    let mut delta = SchemaDelta::default();
    for field in &after_fields {
        match before_fields
            .iter()
            .find(|f| f.kind == field.kind && f.name == field.name)
        {
            None => delta.added.push(field.clone()),
            Some(old) if old.label != field.label => delta.renamed.push(field.clone()),
            Some(_) => {}
        }
    }
    for field in &before_fields {
        if !after_fields
            .iter()
            .any(|f| f.kind == field.kind && f.name == field.name)
        {
            delta.removed.push(field.clone());
        }
    }
    delta
}

/// Owns the on-disk location of the configuration document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Default filename of the configuration document.
    pub const FILENAME: &'static str = "configuration.yml";

    /// Name of the audit-trail subfolder inside an output folder.
    pub const AUDIT_SUBFOLDER: &'static str = "_conf";

    /// Create a store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user project configuration path
    /// (`<config dir>/annotrack/configuration.yml`), when a config
    /// directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("annotrack").join(Self::FILENAME))
        } else {
            dirs::home_dir()
                .map(|home| home.join(".config").join("annotrack").join(Self::FILENAME))
        }
    }

    /// Path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the document.
    ///
    /// Fails with `ConfigMissing` when no file exists yet; the caller must
    /// supply defaults before the first save.
    pub fn load(&self) -> Result<ConfigDocument> {
        if !self.path.exists() {
            return Err(AnnotrackError::ConfigMissing {
                path: self.path.clone(),
            });
        }
        let text = std::fs::read_to_string(&self.path)?;
        let doc: ConfigDocument = serde_yaml::from_str(&text)?;
        doc.validate()?;
        log::info!("Loaded configuration from {:?}", self.path);
        Ok(doc)
    }

    /// Write the document atomically (temp file + rename), replacing prior
    /// content entirely. Merging against history is the reconciler's job,
    /// not this layer's.
    pub fn save(&self, doc: &ConfigDocument) -> Result<()> {
        doc.validate()?;
        let yaml = serde_yaml::to_string(doc)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("yml.tmp");
        std::fs::write(&tmp, &yaml)?;
        std::fs::rename(&tmp, &self.path)?;
        log::info!("Saved configuration to {:?}", self.path);
        Ok(())
    }

    /// Write an audit-trail copy of the document into the output folder's
    /// `_conf` subfolder.
    pub fn save_audit_copy(&self, doc: &ConfigDocument, output_folder: &Path) -> Result<PathBuf> {
        doc.validate()?;
        let folder = output_folder.join(Self::AUDIT_SUBFOLDER);
        std::fs::create_dir_all(&folder)?;
        let path = folder.join(Self::FILENAME);
        std::fs::write(&path, serde_yaml::to_string(doc)?)?;
        log::debug!("Wrote configuration audit copy to {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_labels(names: &[&str]) -> ConfigDocument {
        let mut doc = ConfigDocument::default();
        doc.labels = names
            .iter()
            .enumerate()
            .map(|(i, name)| Label::new((i + 1) as u8, name, [10, 20, 30]))
            .collect();
        doc
    }

    #[test]
    fn test_default_document_is_valid() {
        ConfigDocument::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_gap_in_values() {
        let mut doc = doc_with_labels(&["a", "b", "c"]);
        doc.labels[2].value = 5;
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let mut doc = doc_with_labels(&["a", "b"]);
        doc.labels[1].name = "a".to_string();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_colon_in_field_names() {
        // A ':' in a field name would produce a `kind:name` history column
        // (e.g. `checkbox:a:b`) that the column tokenizer rejects, blocking
        // every later merge of the case's own history file.
        let mut doc = doc_with_labels(&["ich"]);
        doc.checkboxes
            .insert("a:b".to_string(), "A or B".to_string());
        assert!(matches!(
            doc.validate(),
            Err(AnnotrackError::InvalidConfig { .. })
        ));

        let mut doc = doc_with_labels(&["ich"]);
        doc.freetextboxes
            .insert("notes:extra".to_string(), "Notes".to_string());
        assert!(doc.validate().is_err());

        let mut doc = doc_with_labels(&["ich"]);
        let mut set = ComboboxSet::new();
        set.insert("severity:grade".to_string(), ComboboxOptions::new());
        doc.comboboxes.insert("v01".parse().unwrap(), set);
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_field_name() {
        let mut doc = doc_with_labels(&["ich"]);
        doc.checkboxes
            .insert(String::new(), "Unnamed".to_string());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_save_rejects_colon_field_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(ConfigStore::FILENAME));
        let mut doc = doc_with_labels(&["ich"]);
        doc.checkboxes
            .insert("a:b".to_string(), "A or B".to_string());
        assert!(store.save(&doc).is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_remove_label_renumbers() {
        let mut doc = doc_with_labels(&["a", "b", "c", "d"]);
        doc.remove_label(2).unwrap();

        let names: Vec<_> = doc.labels.iter().map(|l| l.name.as_str()).collect();
        let values: Vec<_> = doc.labels.iter().map(|l| l.value).collect();
        assert_eq!(names, ["a", "c", "d"]);
        assert_eq!(values, [1, 2, 3]);
        doc.validate().unwrap();
    }

    #[test]
    fn test_remove_last_label_refused() {
        let mut doc = doc_with_labels(&["only"]);
        let before = doc.clone();
        let err = doc.remove_label(1).unwrap_err();
        assert!(matches!(err, AnnotrackError::EmptyLabelSchema));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_add_label_appends_next_value() {
        let mut doc = doc_with_labels(&["a"]);
        doc.add_label("b", [0, 0, 255]).unwrap();
        assert_eq!(doc.labels[1].value, 2);
        assert!(doc.add_label("b", [0, 0, 0]).is_err());
        assert!(doc.add_label("has space", [0, 0, 0]).is_err());
    }

    #[test]
    fn test_latest_combobox_version_numeric_order() {
        let mut doc = ConfigDocument::default();
        assert_eq!(doc.latest_combobox_version(), None);

        for tag in ["v02", "v10", "v09"] {
            doc.comboboxes
                .insert(tag.parse().unwrap(), ComboboxSet::new());
        }
        assert_eq!(doc.latest_combobox_version().unwrap().to_string(), "v10");
    }

    #[test]
    fn test_diff_detects_add_remove_rename() {
        let mut before = ConfigDocument::default();
        before
            .checkboxes
            .insert("ich".to_string(), "ICH present".to_string());
        before
            .freetextboxes
            .insert("comments".to_string(), "Comments".to_string());

        let mut after = before.clone();
        after.checkboxes.shift_remove("ich");
        after
            .checkboxes
            .insert("ivh".to_string(), "IVH present".to_string());
        *after.freetextboxes.get_mut("comments").unwrap() = "Notes".to_string();

        let delta = diff_classification_schema(&before, &after);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].name, "ivh");
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(delta.removed[0].name, "ich");
        assert_eq!(delta.renamed.len(), 1);
        assert_eq!(delta.renamed[0].name, "comments");
        assert!(!delta.requires_new_combobox_version());
    }

    #[test]
    fn test_diff_combobox_add_requires_snapshot() {
        let before = ConfigDocument::default();
        let mut after = before.clone();
        let mut set = ComboboxSet::new();
        set.insert("severity".to_string(), ComboboxOptions::new());
        after.comboboxes.insert("v01".parse().unwrap(), set);

        let delta = diff_classification_schema(&before, &after);
        assert!(delta.requires_new_combobox_version());
    }

    #[test]
    fn test_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(ConfigStore::FILENAME));
        assert!(matches!(
            store.load(),
            Err(AnnotrackError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn test_store_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(ConfigStore::FILENAME));

        let mut doc = doc_with_labels(&["ich", "ivh"]);
        doc.checkboxes
            .insert("midline_shift".to_string(), "Midline shift".to_string());
        doc.is_display_timer_requested = true;
        store.save(&doc).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, doc);
        // Section order survives the YAML round trip
        assert_eq!(
            loaded.checkboxes.keys().collect::<Vec<_>>(),
            vec!["midline_shift"]
        );
    }

    #[test]
    fn test_save_rejects_invalid_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(ConfigStore::FILENAME));
        let mut doc = doc_with_labels(&["a", "b"]);
        doc.labels[1].value = 7;
        assert!(store.save(&doc).is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_audit_copy() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(ConfigStore::FILENAME));
        let doc = ConfigDocument::default();

        let output = dir.path().join("output");
        std::fs::create_dir_all(&output).unwrap();
        let copy = store.save_audit_copy(&doc, &output).unwrap();
        assert!(copy.starts_with(output.join(ConfigStore::AUDIT_SUBFOLDER)));
        assert!(copy.exists());
    }
}
