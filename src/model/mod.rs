//! Data models for the bookkeeping core.

mod field;
mod label;
mod version;

pub use field::{ClassificationField, FieldKind};
pub use label::{Label, Modality};
pub use version::VersionTag;
