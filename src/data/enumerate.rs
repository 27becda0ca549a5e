use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use walkdir::WalkDir;

use super::error::DatasetError;
use super::model::{find_marker, FilenameTemplate, Markers};

/// Seed used when the caller does not supply its own generator.
pub const DEFAULT_SEED: u64 = 12345;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// List the image/label pairs in `dir` with the default markers, shuffled
/// with a generator seeded from [`DEFAULT_SEED`].
///
/// The ordering is identical across calls and processes for the same set of
/// files.
pub fn find_image_files(dir: &Path) -> Result<Vec<FilenameTemplate>, DatasetError> {
    let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
    find_image_files_with(dir, &Markers::default(), &mut rng)
}

/// List the image/label pairs in `dir` and shuffle them with `rng`.
///
/// A file plays a role when its name contains `<marker>.`. Only the direct
/// children of `dir` are scanned. The colour files are visited in file-name
/// order before shuffling, so the result depends only on the file set and
/// the generator state.
pub fn find_image_files_with<R: Rng + ?Sized>(
    dir: &Path,
    markers: &Markers,
    rng: &mut R,
) -> Result<Vec<FilenameTemplate>, DatasetError> {
    log::info!("Determining list of input files from {}", dir.display());

    let color_files = files_with_marker(dir, &markers.image)?;
    let label_files = files_with_marker(dir, &markers.label)?;

    if color_files.len() != label_files.len() {
        return Err(DatasetError::CountMismatch {
            dir: dir.to_path_buf(),
            images: color_files.len(),
            labels: label_files.len(),
        });
    }

    let templates: Vec<FilenameTemplate> = color_files
        .iter()
        .filter_map(|path| {
            let template = FilenameTemplate::from_path(path, &markers.image);
            if template.is_none() {
                log::warn!("skipping {}: cannot be templated", path.display());
            }
            template
        })
        .collect();

    let mut order: Vec<usize> = (0..templates.len()).collect();
    order.shuffle(rng);
    let shuffled: Vec<FilenameTemplate> = order.into_iter().map(|i| templates[i].clone()).collect();

    log::info!("Found {} images inside {}.", shuffled.len(), dir.display());
    Ok(shuffled)
}

// ---------------------------------------------------------------------------
// Directory scan
// ---------------------------------------------------------------------------

/// Regular files directly inside `dir` whose names match `*<marker>.*`,
/// sorted by file name. Symlinks count when their target is a regular file.
fn files_with_marker(dir: &Path, marker: &str) -> Result<Vec<PathBuf>, DatasetError> {
    let mut matches = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source| DatasetError::Walk {
            dir: dir.to_path_buf(),
            source,
        })?;
        let is_file = if entry.path_is_symlink() {
            entry.path().is_file()
        } else {
            entry.file_type().is_file()
        };
        if !is_file {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            log::debug!("skipping non UTF-8 file name {:?}", entry.file_name());
            continue;
        };
        if find_marker(name, marker).is_some() {
            matches.push(entry.into_path());
        }
    }

    Ok(matches)
}
