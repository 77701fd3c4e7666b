//! Segmentation label data model.

use serde::{Deserialize, Serialize};

/// Imaging modality of the annotation project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    /// Computed tomography; labels carry an HU intensity window.
    #[default]
    Ct,
    /// Magnetic resonance imaging; no intensity window on labels.
    Mri,
}

/// A segmentation label with a name, labelmap value and color.
///
/// `value` fields form a contiguous `1..=N` range matching list position in
/// the configuration document; removing a label renumbers subsequent labels
/// down by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Display name of the label (no spaces)
    pub name: String,
    /// Labelmap value, contiguous from 1 in config order
    pub value: u8,
    /// Red component of the label color
    pub color_r: u8,
    /// Green component of the label color
    pub color_g: u8,
    /// Blue component of the label color
    pub color_b: u8,
    /// Lower HU bound for CT thresholding
    #[serde(rename = "lower_bound_HU", default, skip_serializing_if = "Option::is_none")]
    pub lower_bound_hu: Option<i32>,
    /// Upper HU bound for CT thresholding
    #[serde(rename = "upper_bound_HU", default, skip_serializing_if = "Option::is_none")]
    pub upper_bound_hu: Option<i32>,
}

impl Label {
    /// Create a new label with the given value, name, and color.
    pub fn new(value: u8, name: &str, color: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            value,
            color_r: color[0],
            color_g: color[1],
            color_b: color[2],
            lower_bound_hu: None,
            upper_bound_hu: None,
        }
    }

    /// Attach a CT intensity window.
    pub fn with_hu_bounds(mut self, lower: i32, upper: i32) -> Self {
        self.lower_bound_hu = Some(lower);
        self.upper_bound_hu = Some(upper);
        self
    }

    /// RGB color triple of the label.
    pub fn color(&self) -> [u8; 3] {
        [self.color_r, self.color_g, self.color_b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_color() {
        let label = Label::new(1, "ICH", [255, 10, 10]).with_hu_bounds(30, 90);
        assert_eq!(label.color(), [255, 10, 10]);
        assert_eq!(label.lower_bound_hu, Some(30));
        assert_eq!(label.upper_bound_hu, Some(90));
    }

    #[test]
    fn test_hu_bounds_optional_in_yaml() {
        let yaml = "name: edema\nvalue: 2\ncolor_r: 0\ncolor_g: 128\ncolor_b: 0\n";
        let label: Label = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(label.name, "edema");
        assert!(label.lower_bound_hu.is_none());
    }

    #[test]
    fn test_hu_key_spelling() {
        let label = Label::new(1, "ICH", [255, 10, 10]).with_hu_bounds(30, 90);
        let yaml = serde_yaml::to_string(&label).unwrap();
        assert!(yaml.contains("lower_bound_HU: 30"));
        assert!(yaml.contains("upper_bound_HU: 90"));
    }
}
