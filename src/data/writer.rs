use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Float32Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::Array3;
use parquet::arrow::ArrowWriter;

use super::model::{FilenameTemplate, Markers, PreparedDataset};

const MANIFEST_HEADER: [&str; 3] = ["template", "image", "label"];

/// Save a template list so a later run can reuse the exact ordering.
///
/// `.json` writes a plain array of template strings; `.csv` writes
/// `template,image,label` rows with both resolved paths.
pub fn write_manifest(path: &Path, templates: &[FilenameTemplate], markers: &Markers) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => {
            let texts: Vec<String> = templates.iter().map(ToString::to_string).collect();
            let json = serde_json::to_string_pretty(&texts).context("serializing manifest")?;
            std::fs::write(path, json)
                .with_context(|| format!("writing {}", path.display()))?;
        }
        "csv" => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("creating {}", path.display()))?;
            // Written up front so an empty manifest still has its columns.
            writer
                .write_record(MANIFEST_HEADER)
                .context("writing CSV header")?;
            for template in templates {
                writer
                    .write_record([
                        template.to_string(),
                        template.image_path(markers).display().to_string(),
                        template.label_path(markers).display().to_string(),
                    ])
                    .context("writing CSV row")?;
            }
            writer.flush().context("flushing CSV manifest")?;
        }
        other => bail!("Unsupported manifest extension: .{other}"),
    }

    log::info!("Wrote {} templates to {}", templates.len(), path.display());
    Ok(())
}

/// Write a prepared dataset as a single-batch Parquet file.
///
/// Every pair becomes one row; pixel lists are flattened in HWC order.
pub fn write_parquet(path: &Path, dataset: &PreparedDataset) -> Result<()> {
    let batch = to_record_batch(dataset)?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;

    log::info!("Wrote {} pairs to {}", dataset.len(), path.display());
    Ok(())
}

/// One row per pair: `template`, `height`, `width`, `image`, `label`.
pub(crate) fn to_record_batch(dataset: &PreparedDataset) -> Result<RecordBatch> {
    let item = || Arc::new(Field::new("item", DataType::Float32, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("template", DataType::Utf8, false),
        Field::new("height", DataType::Int64, false),
        Field::new("width", DataType::Int64, false),
        Field::new("image", DataType::List(item()), false),
        Field::new("label", DataType::List(item()), false),
    ]));

    let templates = StringArray::from(
        dataset
            .templates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    );
    let heights = Int64Array::from(
        dataset
            .images
            .iter()
            .map(|img| img.dim().0 as i64)
            .collect::<Vec<_>>(),
    );
    let widths = Int64Array::from(
        dataset
            .images
            .iter()
            .map(|img| img.dim().1 as i64)
            .collect::<Vec<_>>(),
    );

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(templates),
            Arc::new(heights),
            Arc::new(widths),
            Arc::new(build_pixel_lists(&dataset.images)),
            Arc::new(build_pixel_lists(&dataset.labels)),
        ],
    )
    .context("assembling record batch")
}

fn build_pixel_lists(arrays: &[Array3<f32>]) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float32Builder::new());
    for array in arrays {
        let values = builder.values();
        for &v in array.iter() {
            values.append_value(v);
        }
        builder.append(true);
    }
    builder.finish()
}
