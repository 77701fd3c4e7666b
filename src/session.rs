//! One annotator's working session over a volume folder and an output
//! folder.
//!
//! [`AnnotationSession`] is the facade the host application drives: it loads
//! the configuration, partitions the case lists, times the active case, and
//! turns save requests into history-table updates plus reserved artifact
//! filenames. The host owns the actual image data; this layer only does the
//! bookkeeping around it.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::caselist::{discover_cases, CaseListManager};
use crate::config::{ConfigDocument, ConfigStore};
use crate::error::{AnnotrackError, Result};
use crate::format::CsvTable;
use crate::ledger::{
    ClassificationRecord, LineMeasurement, SegmentationRecord, VersionLedger, ABSENT_MARKER,
};
use crate::model::{ClassificationField, VersionTag};
use crate::reconcile;
use crate::timer::AnnotationTimer;

/// Who is annotating, recorded verbatim into every history row.
#[derive(Debug, Clone)]
pub struct AnnotatorIdentity {
    /// Annotator name or initials
    pub name: String,
    /// Professional degree
    pub degree: String,
    /// Revision step of the study protocol
    pub revision_step: String,
}

impl AnnotatorIdentity {
    /// Create an identity record.
    pub fn new(name: &str, degree: &str, revision_step: &str) -> Self {
        Self {
            name: name.to_string(),
            degree: degree.to_string(),
            revision_step: revision_step.to_string(),
        }
    }
}

/// Result of a segmentation save.
#[derive(Debug, Clone)]
pub struct SegmentationOutcome {
    /// Version assigned to the artifact
    pub version: VersionTag,
    /// Path the host must write the labelmap artifact to
    pub artifact_path: PathBuf,
    /// Path of the updated history table
    pub history_path: PathBuf,
    /// The case that became active after the save
    pub next_case: Option<String>,
}

/// Result of a classification save.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    /// Version assigned to this classification
    pub version: VersionTag,
    /// Path of the updated history table
    pub history_path: PathBuf,
    /// The case that became active after the save
    pub next_case: Option<String>,
}

/// Field values recovered from a historical classification row.
#[derive(Debug, Clone)]
pub struct ClassificationReadback {
    /// Version of the row that was read
    pub version: VersionTag,
    /// `kind:name` column spelling and recorded value, for every field that
    /// existed when the row was written
    pub values: Vec<(String, String)>,
}

/// Live session state for one annotator.
pub struct AnnotationSession {
    store: ConfigStore,
    config: ConfigDocument,
    output_folder: PathBuf,
    annotator: AnnotatorIdentity,
    cases: CaseListManager,
    timer: AnnotationTimer,
}

impl AnnotationSession {
    /// Open a session: load the configuration, discover cases, partition
    /// the work lists and drop an audit copy of the configuration into the
    /// output folder.
    pub fn open(
        store: ConfigStore,
        volume_folder: &Path,
        output_folder: &Path,
        annotator: AnnotatorIdentity,
    ) -> Result<Self> {
        let config = store.load()?;
        let discovered = discover_cases(volume_folder, &config.input_filetype)?;
        let mut cases = CaseListManager::partition(output_folder, discovered)?;
        // Resume where prior work left off instead of at the first working
        // case, which may already be saved.
        if let Some(first) = cases.first_remaining().map(String::from) {
            cases.select(&first)?;
        }
        store.save_audit_copy(&config, output_folder)?;

        log::info!(
            "Session opened for '{}': {} case(s), {} remaining",
            annotator.name,
            cases.case_count(),
            cases.remaining_list().len()
        );
        Ok(Self {
            store,
            config,
            output_folder: output_folder.to_path_buf(),
            annotator,
            cases,
            timer: AnnotationTimer::new(),
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    /// Replace the configuration, persisting it and refreshing the audit
    /// copy. Combobox-schema changes must already have gone through
    /// `reconcile::cut_new_combobox_version` on the new document.
    pub fn update_config(&mut self, config: ConfigDocument) -> Result<()> {
        self.store.save(&config)?;
        self.store.save_audit_copy(&config, &self.output_folder)?;
        self.config = config;
        Ok(())
    }

    /// Case-list navigation state.
    pub fn cases(&self) -> &CaseListManager {
        &self.cases
    }

    /// Mutable case-list navigation (Next/Previous buttons, explicit case
    /// selection).
    pub fn cases_mut(&mut self) -> &mut CaseListManager {
        &mut self.cases
    }

    /// The per-case annotation timer.
    pub fn timer(&self) -> &AnnotationTimer {
        &self.timer
    }

    /// Mutable timer access for start/pause/resume events.
    pub fn timer_mut(&mut self) -> &mut AnnotationTimer {
        &mut self.timer
    }

    /// The case filename without the configured input extension.
    pub fn case_stem<'a>(&self, case: &'a str) -> &'a str {
        case.strip_suffix(self.config.input_filetype.as_str())
            .unwrap_or(case)
    }

    /// Output subfolder of one case.
    pub fn case_folder(&self, case: &str) -> PathBuf {
        self.output_folder.join(self.case_stem(case))
    }

    /// Save a segmentation of the active case.
    ///
    /// Computes the next version from the artifact filenames already in the
    /// case folder, appends a history row, rewrites the work lists, resets
    /// the timer, and returns the path the host must write the labelmap to.
    pub fn save_segmentation(&mut self, lines: Vec<LineMeasurement>) -> Result<SegmentationOutcome> {
        let case = self.active_case()?;
        let stem = self.case_stem(&case).to_string();
        let case_folder = self.case_folder(&case);
        std::fs::create_dir_all(&case_folder)?;

        let existing = self.versioned_artifacts(&case_folder, &stem)?;
        let version = VersionLedger::next_segmentation_version(&existing)?;

        self.timer.stop();
        let record = SegmentationRecord {
            case: case.clone(),
            version,
            annotator_name: self.annotator.name.clone(),
            annotator_degree: self.annotator.degree.clone(),
            revision_step: self.annotator.revision_step.clone(),
            saved_at: Local::now().naive_local(),
            duration_secs: self.timer.total().as_secs_f64(),
            label_durations: self
                .timer
                .label_totals()
                .into_iter()
                .map(|(label, d)| (label, d.as_secs_f64()))
                .collect(),
            lines,
        };

        let history_path = case_folder.join(format!("{stem}_SegmentationInformation.csv"));
        let table = CsvTable::load(&history_path)?;
        let table = VersionLedger::append_segmentation_row(table, &self.config.labels, &record);
        table.write(&history_path)?;

        let next_case = self.cases.advance_after_save(&case)?.map(String::from);
        self.timer.reset();

        let artifact_path =
            case_folder.join(format!("{stem}_{version}{}", self.config.input_filetype));
        log::info!("Saved segmentation {version} of '{case}'");
        Ok(SegmentationOutcome {
            version,
            artifact_path,
            history_path,
            next_case,
        })
    }

    /// Save a classification of the active case.
    ///
    /// Values are keyed by the live schema fields; the new row records the
    /// latest combobox-schema version so it can be re-displayed later.
    pub fn save_classification(
        &mut self,
        values: Vec<(ClassificationField, String)>,
    ) -> Result<ClassificationOutcome> {
        let case = self.active_case()?;
        let stem = self.case_stem(&case).to_string();
        let case_folder = self.case_folder(&case);
        std::fs::create_dir_all(&case_folder)?;

        let history_path = case_folder.join(format!("{stem}_ClassificationInformation.csv"));
        let existing = CsvTable::load(&history_path)?;
        let version = VersionLedger::next_classification_version(existing.as_ref())?;

        let record = ClassificationRecord {
            case: case.clone(),
            version,
            combobox_version: self.config.latest_combobox_version(),
            annotator_name: self.annotator.name.clone(),
            annotator_degree: self.annotator.degree.clone(),
            revision_step: self.annotator.revision_step.clone(),
            saved_at: Local::now().naive_local(),
            values,
        };

        let fields = self.config.classification_fields();
        let table = VersionLedger::merge_classification_rows(existing, &fields, &record)?;
        table.write(&history_path)?;

        let next_case = self.cases.advance_after_save(&case)?.map(String::from);
        log::info!("Saved classification {version} of '{case}'");
        Ok(ClassificationOutcome {
            version,
            history_path,
            next_case,
        })
    }

    /// Read one historical classification row of a case back, restricted to
    /// the fields that existed when it was recorded.
    pub fn load_classification_version(
        &self,
        case: &str,
        version: VersionTag,
    ) -> Result<ClassificationReadback> {
        let stem = self.case_stem(case);
        let history_path = self
            .case_folder(case)
            .join(format!("{stem}_ClassificationInformation.csv"));
        let table = CsvTable::load(&history_path)?.ok_or_else(|| {
            AnnotrackError::invalid_table(format!("no classification history for '{case}'"))
        })?;

        // Validates that the recorded combobox snapshot still resolves.
        reconcile::resolve_combobox_set_for_row(&table, version, &self.config)?;

        let row_index = reconcile::find_classification_row(&table, version)?;
        let present = reconcile::fields_present_in_history(&table, version)?;
        let mut values = Vec::new();
        for key in present {
            let column = key.encode();
            let cell = table.get(row_index, &column).unwrap_or(ABSENT_MARKER);
            values.push((column, cell.to_string()));
        }
        Ok(ClassificationReadback { version, values })
    }

    /// Filenames of the versioned segmentation artifacts already saved for
    /// a case, e.g. `sub-001_v01.nii.gz`. History tables and other files in
    /// the case folder are not artifacts.
    fn versioned_artifacts(&self, case_folder: &Path, stem: &str) -> Result<Vec<String>> {
        let prefix = format!("{stem}_v");
        let mut artifacts = Vec::new();
        for entry in std::fs::read_dir(case_folder)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(self.config.input_filetype.as_str()) {
                artifacts.push(name.to_string());
            }
        }
        Ok(artifacts)
    }

    fn active_case(&self) -> Result<String> {
        self.cases
            .current_case()
            .map(String::from)
            .ok_or_else(|| AnnotrackError::inconsistent_workflow("no active case"))
    }
}
