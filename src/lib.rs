//! Case, version and classification bookkeeping for CT/MRI annotation
//! sessions.
//!
//! A host application (the viewer that actually renders volumes and
//! labelmaps) drives an [`AnnotationSession`]: the session partitions the
//! case set into working and remaining lists, times the active case,
//! assigns `vNN` versions to saved artifacts, and appends to the per-case
//! CSV history tables without ever rewriting a recorded row.
//!
//! The classification schema is allowed to drift mid-project. Combobox
//! option sets are versioned by append-only snapshots in the configuration
//! document, history columns carry a `kind:name` identity, and the absent
//! marker `--` distinguishes "this field did not exist yet" from "the
//! annotator left it blank".

pub mod caselist;
pub mod config;
pub mod error;
pub mod format;
pub mod ledger;
pub mod model;
pub mod reconcile;
pub mod session;
pub mod timer;

pub use caselist::CaseListManager;
pub use config::{ConfigDocument, ConfigStore, SchemaDelta};
pub use error::{AnnotrackError, Result};
pub use format::{ColumnKey, CsvTable};
pub use ledger::{LineMeasurement, VersionLedger, ABSENT_MARKER};
pub use model::{ClassificationField, FieldKind, Label, Modality, VersionTag};
pub use session::{AnnotationSession, AnnotatorIdentity};
pub use timer::{AnnotationTimer, TimerState};
