pub mod config;
pub mod data;

pub use config::PrepConfig;
pub use data::decode::{PngDecoder, RasterDecoder};
pub use data::enumerate::{find_image_files, find_image_files_with, DEFAULT_SEED};
pub use data::error::DatasetError;
pub use data::model::{FilenameTemplate, Markers, PreparedDataset, ShapeSummary};
pub use data::reader::{one_hot, read_dataset, read_image_files, ReadPolicy};
