/// Data layer: pair discovery, decoding, and persistence.
///
/// Architecture:
/// ```text
///   data_dir/*_image.* + *_label.*
///        │
///        ▼
///   ┌───────────┐
///   │ enumerate  │  pair by marker, seeded shuffle → Vec<FilenameTemplate>
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  reader   │  RasterDecoder → (h,w,1) image, (h,w,2) one-hot label
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ writer / loader   │  manifest (.json/.csv), archive (.parquet)
///   └──────────────────┘
/// ```

pub mod decode;
pub mod enumerate;
pub mod error;
pub mod loader;
pub mod model;
pub mod reader;
pub mod writer;
