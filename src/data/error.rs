use std::path::PathBuf;

use thiserror::Error;

use super::decode::DecodeError;

/// Dataset integrity failures raised while enumerating or reading pairs.
///
/// Every variant names the file or directory involved so callers can decide
/// between aborting and skipping.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{}: found {images} image files but {labels} label files", .dir.display())]
    CountMismatch {
        dir: PathBuf,
        images: usize,
        labels: usize,
    },

    #[error("{}: decoded raster has rank {rank}, expected 3", .path.display())]
    Rank { path: PathBuf, rank: usize },

    #[error("{}: decoded raster has {channels} channels, expected 1", .path.display())]
    Channels { path: PathBuf, channels: usize },

    #[error("reading {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("listing {}", .dir.display())]
    Walk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
