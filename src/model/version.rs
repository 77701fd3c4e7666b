//! Version tags for segmentation, classification and combobox-schema
//! snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotrackError, Result};

/// A `vNN` version tag with a two-digit zero-padded number in `1..=99`.
///
/// Tags order numerically (`v02 < v10`). `next()` saturates at
/// [`VersionTag::MAX_NUMBER`]; the version space per case is deliberately
/// capped.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(u8);

impl VersionTag {
    /// Highest representable version number.
    pub const MAX_NUMBER: u8 = 99;

    /// The first version of any artifact.
    pub const FIRST: VersionTag = VersionTag(1);

    /// Create a tag from a version number in `1..=99`.
    pub fn new(number: u8) -> Result<Self> {
        if number == 0 || number > Self::MAX_NUMBER {
            return Err(AnnotrackError::malformed_version_tag(format!(
                "v{number}"
            )));
        }
        Ok(Self(number))
    }

    /// The numeric part of the tag.
    pub fn number(&self) -> u8 {
        self.0
    }

    /// The following version, saturating at [`VersionTag::MAX_NUMBER`].
    pub fn next(&self) -> VersionTag {
        VersionTag(self.0.saturating_add(1).min(Self::MAX_NUMBER))
    }

    /// Extract the trailing `_vNN` tag from a versioned artifact filename
    /// such as `sub-001_v03.nii.gz`.
    ///
    /// Fails with `MalformedVersionTag` when no tag is present or the digits
    /// do not parse; unversioned filenames in an output folder are a
    /// corruption signal, not something to guess around.
    pub fn from_artifact_name(filename: &str) -> Result<VersionTag> {
        let start = filename
            .rfind("_v")
            .ok_or_else(|| AnnotrackError::malformed_version_tag(filename))?;
        let after = &filename[start + 2..];
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(AnnotrackError::malformed_version_tag(filename));
        }
        format!("v{digits}").parse()
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:02}", self.0)
    }
}

impl FromStr for VersionTag {
    type Err = AnnotrackError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix('v')
            .ok_or_else(|| AnnotrackError::malformed_version_tag(s))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AnnotrackError::malformed_version_tag(s));
        }
        let number: u8 = digits
            .parse()
            .map_err(|_| AnnotrackError::malformed_version_tag(s))?;
        Self::new(number).map_err(|_| AnnotrackError::malformed_version_tag(s))
    }
}

impl TryFrom<String> for VersionTag {
    type Error = AnnotrackError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_zero_padded() {
        assert_eq!(VersionTag::new(1).unwrap().to_string(), "v01");
        assert_eq!(VersionTag::new(42).unwrap().to_string(), "v42");
    }

    #[test]
    fn test_parse_roundtrip() {
        let tag: VersionTag = "v07".parse().unwrap();
        assert_eq!(tag.number(), 7);
        assert_eq!(tag.to_string(), "v07");

        // Unpadded digits are accepted on input
        let tag: VersionTag = "v7".parse().unwrap();
        assert_eq!(tag.number(), 7);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<VersionTag>().is_err());
        assert!("07".parse::<VersionTag>().is_err());
        assert!("v".parse::<VersionTag>().is_err());
        assert!("vXY".parse::<VersionTag>().is_err());
        assert!("v0".parse::<VersionTag>().is_err());
        assert!("v100".parse::<VersionTag>().is_err());
        assert!("v-3".parse::<VersionTag>().is_err());
    }

    #[test]
    fn test_numeric_ordering() {
        let v2: VersionTag = "v02".parse().unwrap();
        let v10: VersionTag = "v10".parse().unwrap();
        assert!(v2 < v10);
    }

    #[test]
    fn test_next_saturates() {
        assert_eq!(VersionTag::new(1).unwrap().next().number(), 2);
        assert_eq!(VersionTag::new(99).unwrap().next().number(), 99);
    }

    #[test]
    fn test_from_artifact_name() {
        let tag = VersionTag::from_artifact_name("sub-001_v03.nii.gz").unwrap();
        assert_eq!(tag.number(), 3);

        // The last `_v` wins when the case name itself contains one
        let tag = VersionTag::from_artifact_name("case_v2_v11.nrrd").unwrap();
        assert_eq!(tag.number(), 11);

        assert!(VersionTag::from_artifact_name("sub-001.nii.gz").is_err());
        assert!(VersionTag::from_artifact_name("sub-001_v.nii.gz").is_err());
    }
}
