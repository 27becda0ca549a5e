use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::enumerate::DEFAULT_SEED;
use crate::data::model::Markers;

/// Settings shared by every `segprep` command.
///
/// ```json
/// {
///   "markers": { "image": "_image", "label": "_label" },
///   "seed": 12345
/// }
/// ```
///
/// Missing keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    pub markers: Markers,
    /// Seed of the generator that shuffles the pair list.
    pub seed: u64,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            markers: Markers::default(),
            seed: DEFAULT_SEED,
        }
    }
}

impl PrepConfig {
    /// Load a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PrepConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.markers.image.is_empty() || config.markers.label.is_empty() {
            anyhow::bail!("{}: markers must not be empty", path.display());
        }
        if config.markers.image == config.markers.label {
            anyhow::bail!(
                "{}: image and label markers are both '{}'",
                path.display(),
                config.markers.image
            );
        }
        Ok(config)
    }
}
