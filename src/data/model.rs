use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Stand-in for the role marker inside a template's file name.
pub const PLACEHOLDER: &str = "%s";

/// Upper bound of the 8-bit pixel range, used to build label complements.
pub const LABEL_MAX: f32 = 255.0;

// ---------------------------------------------------------------------------
// Markers – role substrings embedded in file names
// ---------------------------------------------------------------------------

/// The substrings that tell a colour image apart from its label image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Marker of the input image, `_image` in `scan_image.png`.
    pub image: String,
    /// Marker of the label image, `_label` in `scan_label.png`.
    pub label: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            image: "_image".to_string(),
            label: "_label".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// FilenameTemplate – one image/label pair on disk
// ---------------------------------------------------------------------------

/// A file path whose role marker has been replaced by [`PLACEHOLDER`].
///
/// Only the file-name component is templated; the parent directory is kept
/// verbatim so marker text in directory names never gets rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilenameTemplate {
    dir: PathBuf,
    prefix: String,
    suffix: String,
}

impl FilenameTemplate {
    /// Build a template from a path whose file name contains `<marker>.`.
    ///
    /// The rightmost occurrence is templated, so `a_image_image.png` keeps
    /// its first `_image`. Returns `None` when the name has no such
    /// occurrence, is not valid UTF-8, or carries [`PLACEHOLDER`] after the
    /// marker (its textual form would not parse back to the same paths).
    pub fn from_path(path: &Path, marker: &str) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let at = find_marker(name, marker)?;
        if name[at + marker.len()..].contains(PLACEHOLDER) {
            return None;
        }
        Some(Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: name[..at].to_string(),
            suffix: name[at + marker.len()..].to_string(),
        })
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        let path = Path::new(text);
        let name = path.file_name()?.to_str()?;
        let (prefix, suffix) = name.rsplit_once(PLACEHOLDER)?;
        Some(Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Substitute `marker` for the placeholder.
    pub fn resolve(&self, marker: &str) -> PathBuf {
        self.dir
            .join(format!("{}{marker}{}", self.prefix, self.suffix))
    }

    /// Path of the colour image.
    pub fn image_path(&self, markers: &Markers) -> PathBuf {
        self.resolve(&markers.image)
    }

    /// Path of the label image.
    pub fn label_path(&self, markers: &Markers) -> PathBuf {
        self.resolve(&markers.label)
    }
}

impl fmt::Display for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let templated = self.resolve(PLACEHOLDER);
        write!(f, "{}", templated.display())
    }
}

/// Byte offset of the rightmost `marker` that is directly followed by a dot,
/// which is what the glob `*<marker>.*` accepts.
pub(crate) fn find_marker(name: &str, marker: &str) -> Option<usize> {
    if marker.is_empty() {
        return None;
    }
    name.rmatch_indices(marker)
        .map(|(i, _)| i)
        .find(|&i| name[i + marker.len()..].starts_with('.'))
}

// ---------------------------------------------------------------------------
// PreparedDataset – decoded arrays ready for training
// ---------------------------------------------------------------------------

/// Parallel collections of templates, images (h, w, 1) and one-hot labels
/// (h, w, 2). Entry `i` of each vector belongs to the same pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedDataset {
    pub templates: Vec<FilenameTemplate>,
    pub images: Vec<Array3<f32>>,
    pub labels: Vec<Array3<f32>>,
}

impl PreparedDataset {
    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn push(&mut self, template: FilenameTemplate, image: Array3<f32>, label: Array3<f32>) {
        self.templates.push(template);
        self.images.push(image);
        self.labels.push(label);
    }

    pub fn shape_summary(&self) -> ShapeSummary {
        ShapeSummary::of(&self.images)
    }

    /// Fraction of label pixels whose positive channel is above half range.
    pub fn positive_fraction(&self) -> f64 {
        let mut total = 0usize;
        let mut positive = 0usize;
        for label in &self.labels {
            for &v in label.index_axis(ndarray::Axis(2), 0).iter() {
                total += 1;
                if v > LABEL_MAX / 2.0 {
                    positive += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            positive as f64 / total as f64
        }
    }
}

// ---------------------------------------------------------------------------
// ShapeSummary – how the stacked image collection looks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeSummary {
    Empty,
    /// Every image has the same height and width.
    Uniform {
        count: usize,
        height: usize,
        width: usize,
    },
    /// Images disagree on height or width, so they cannot be stacked.
    Mixed { count: usize },
}

impl ShapeSummary {
    pub fn of(images: &[Array3<f32>]) -> Self {
        let Some(first) = images.first() else {
            return ShapeSummary::Empty;
        };
        let (height, width, _) = first.dim();
        let uniform = images
            .iter()
            .all(|img| img.dim().0 == height && img.dim().1 == width);
        if uniform {
            ShapeSummary::Uniform {
                count: images.len(),
                height,
                width,
            }
        } else {
            ShapeSummary::Mixed {
                count: images.len(),
            }
        }
    }
}

impl fmt::Display for ShapeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeSummary::Empty => write!(f, "(0,)"),
            ShapeSummary::Uniform {
                count,
                height,
                width,
            } => write!(f, "({count}, {height}, {width}, 1)"),
            ShapeSummary::Mixed { count } => write!(f, "({count},) with mixed image shapes"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips_both_paths() {
        let markers = Markers::default();
        let path = Path::new("/data/train/scan_01_image.png");
        let template = FilenameTemplate::from_path(path, &markers.image).expect("template");

        assert_eq!(template.image_path(&markers), path);
        assert_eq!(
            template.label_path(&markers),
            Path::new("/data/train/scan_01_label.png")
        );
        assert_eq!(template.to_string(), "/data/train/scan_01%s.png");
    }

    #[test]
    fn template_ignores_marker_in_directory() {
        let markers = Markers::default();
        let path = Path::new("/data/raw_images/a_image.png");
        let template = FilenameTemplate::from_path(path, &markers.image).expect("template");
        assert_eq!(
            template.label_path(&markers),
            Path::new("/data/raw_images/a_label.png")
        );
    }

    #[test]
    fn template_uses_rightmost_marker_before_extension() {
        let path = Path::new("x_image_image.png");
        let template = FilenameTemplate::from_path(path, "_image").expect("template");
        assert_eq!(template.resolve("_label"), Path::new("x_image_label.png"));
    }

    #[test]
    fn template_requires_marker_before_dot() {
        assert!(FilenameTemplate::from_path(Path::new("a_imagery.png"), "_image").is_none());
        assert!(FilenameTemplate::from_path(Path::new("a_image"), "_image").is_none());
        assert!(FilenameTemplate::from_path(Path::new("a_image.png"), "").is_none());
    }

    #[test]
    fn template_rejects_placeholder_after_marker() {
        assert!(FilenameTemplate::from_path(Path::new("a_image.%s.png"), "_image").is_none());

        let template =
            FilenameTemplate::from_path(Path::new("d/50%s_image.png"), "_image").expect("template");
        let parsed = FilenameTemplate::parse(&template.to_string()).expect("parse");
        assert_eq!(parsed.resolve("_label"), Path::new("d/50%s_label.png"));
    }

    #[test]
    fn template_parses_its_display_form() {
        let template =
            FilenameTemplate::from_path(Path::new("dir/b_image.tar.png"), "_image").expect("template");
        let parsed = FilenameTemplate::parse(&template.to_string()).expect("parse");
        assert_eq!(parsed, template);
        assert!(FilenameTemplate::parse("dir/no_placeholder.png").is_none());
    }

    #[test]
    fn shape_summary_reports_uniform_and_mixed() {
        assert_eq!(ShapeSummary::of(&[]), ShapeSummary::Empty);

        let same = vec![Array3::zeros((4, 5, 1)), Array3::zeros((4, 5, 1))];
        assert_eq!(
            ShapeSummary::of(&same),
            ShapeSummary::Uniform {
                count: 2,
                height: 4,
                width: 5
            }
        );
        assert_eq!(ShapeSummary::of(&same).to_string(), "(2, 4, 5, 1)");

        let mixed = vec![Array3::zeros((4, 5, 1)), Array3::zeros((5, 4, 1))];
        assert_eq!(ShapeSummary::of(&mixed), ShapeSummary::Mixed { count: 2 });
    }

    #[test]
    fn positive_fraction_counts_first_channel() {
        let mut dataset = PreparedDataset::default();
        let label = Array3::from_shape_fn((1, 4, 2), |(_, x, c)| {
            let v = if x == 0 { 255.0 } else { 0.0 };
            if c == 0 { v } else { LABEL_MAX - v }
        });
        dataset.push(
            FilenameTemplate::parse("a%s.png").expect("parse"),
            Array3::zeros((1, 4, 1)),
            label,
        );
        assert!((dataset.positive_fraction() - 0.25).abs() < 1e-12);
        assert_eq!(PreparedDataset::default().positive_fraction(), 0.0);
    }
}
