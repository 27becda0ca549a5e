use std::path::Path;

use ndarray::{Array3, Ix3};

use super::decode::RasterDecoder;
use super::error::DatasetError;
use super::model::{FilenameTemplate, Markers, PreparedDataset, LABEL_MAX};

/// What to do when a pair fails to read or validate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Abort the whole read on the first bad pair.
    #[default]
    FailFast,
    /// Log the bad pair, drop it, and keep going.
    SkipInvalid,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Decode every pair named by `templates`, in order.
///
/// Returns the images (h, w, 1) and the one-hot labels (h, w, 2) as two
/// parallel vectors. The first pair that cannot be read or has the wrong
/// shape aborts the call.
pub fn read_image_files<D: RasterDecoder + ?Sized>(
    templates: &[FilenameTemplate],
    markers: &Markers,
    decoder: &D,
) -> Result<(Vec<Array3<f32>>, Vec<Array3<f32>>), DatasetError> {
    let dataset = read_dataset(templates, markers, decoder, ReadPolicy::FailFast)?;
    Ok((dataset.images, dataset.labels))
}

/// Decode every pair named by `templates` into a [`PreparedDataset`].
pub fn read_dataset<D: RasterDecoder + ?Sized>(
    templates: &[FilenameTemplate],
    markers: &Markers,
    decoder: &D,
    policy: ReadPolicy,
) -> Result<PreparedDataset, DatasetError> {
    let mut dataset = PreparedDataset::default();

    for template in templates {
        match read_pair(template, markers, decoder) {
            Ok((image, label)) => dataset.push(template.clone(), image, label),
            Err(err) if policy == ReadPolicy::SkipInvalid => {
                log::warn!("skipping {template}: {}", error_chain(&err));
            }
            Err(err) => return Err(err),
        }
    }

    log::info!(
        "Total {} images and labels are read. The shape of train_images is {}.",
        dataset.len(),
        dataset.shape_summary()
    );
    Ok(dataset)
}

/// Decode one image and its label; the label comes back one-hot encoded.
pub fn read_pair<D: RasterDecoder + ?Sized>(
    template: &FilenameTemplate,
    markers: &Markers,
    decoder: &D,
) -> Result<(Array3<f32>, Array3<f32>), DatasetError> {
    let image = load_raster(&template.image_path(markers), decoder)?;
    let label = load_raster(&template.label_path(markers), decoder)?;
    Ok((image, one_hot(&label)))
}

/// Read `path` and decode it into a single-channel (h, w, 1) raster.
pub fn load_raster<D: RasterDecoder + ?Sized>(
    path: &Path,
    decoder: &D,
) -> Result<Array3<f32>, DatasetError> {
    let bytes = std::fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raster = decoder.decode(&bytes).map_err(|source| DatasetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    if raster.ndim() != 3 {
        return Err(DatasetError::Rank {
            path: path.to_path_buf(),
            rank: raster.ndim(),
        });
    }
    let channels = raster.shape()[2];
    if channels != 1 {
        return Err(DatasetError::Channels {
            path: path.to_path_buf(),
            channels,
        });
    }

    raster
        .into_dimensionality::<Ix3>()
        .map_err(|source| DatasetError::Decode {
            path: path.to_path_buf(),
            source: source.into(),
        })
}

/// Expand a single-channel label into the two-channel binary one-hot form:
/// channel 0 keeps the value `v`, channel 1 holds `255 - v`.
pub fn one_hot(label: &Array3<f32>) -> Array3<f32> {
    let (height, width, _) = label.dim();
    Array3::from_shape_fn((height, width, 2), |(y, x, c)| {
        let v = label[[y, x, 0]];
        if c == 0 {
            v
        } else {
            LABEL_MAX - v
        }
    })
}

fn error_chain(err: &DatasetError) -> String {
    let mut text = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
