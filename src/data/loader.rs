use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Int64Array, LargeListArray, ListArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use ndarray::Array3;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{FilenameTemplate, PreparedDataset};

// ---------------------------------------------------------------------------
// Manifest loading
// ---------------------------------------------------------------------------

/// Load a saved template list.  Dispatch by extension.
///
/// Supported formats:
/// * `.json` – `["dir/a%s.png", "dir/b%s.png", ...]`
/// * `.csv`  – header row with a `template` column; other columns ignored
pub fn load_manifest(path: &Path) -> Result<Vec<FilenameTemplate>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => load_manifest_json(path),
        "csv" => load_manifest_csv(path),
        other => bail!("Unsupported manifest extension: .{other}"),
    }
}

fn load_manifest_json(path: &Path) -> Result<Vec<FilenameTemplate>> {
    let text = std::fs::read_to_string(path).context("reading JSON manifest")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON manifest")?;

    let entries = root
        .as_array()
        .context("Expected top-level JSON array")?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let text = entry
                .as_str()
                .with_context(|| format!("Entry {i} is not a string"))?;
            parse_template(text, i)
        })
        .collect()
}

fn load_manifest_csv(path: &Path) -> Result<Vec<FilenameTemplate>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV manifest")?;
    let template_idx = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .position(|h| h == "template")
        .context("CSV missing 'template' column")?;

    let mut templates = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let text = record
            .get(template_idx)
            .with_context(|| format!("CSV row {row_no}: missing template"))?;
        templates.push(parse_template(text, row_no)?);
    }
    Ok(templates)
}

fn parse_template(text: &str, row: usize) -> Result<FilenameTemplate> {
    FilenameTemplate::parse(text)
        .with_context(|| format!("Row {row}: '{text}' has no placeholder in its file name"))
}

// ---------------------------------------------------------------------------
// Parquet archive loading
// ---------------------------------------------------------------------------

/// Load a prepared dataset written by [`super::writer::write_parquet`].
///
/// Expected schema:
/// - `template`: Utf8
/// - `height`, `width`: Int64
/// - `image`: List<Float32> with `height * width` values
/// - `label`: List<Float32> with `height * width * 2` values (HWC order)
pub fn load_parquet(path: &Path) -> Result<PreparedDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut dataset = PreparedDataset::default();
    let mut offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        append_batch(&mut dataset, &batch, offset)?;
        offset += batch.num_rows();
    }

    Ok(dataset)
}

/// Decode the rows of one record batch into `dataset`. `offset` is the
/// archive-wide index of the batch's first row, used in error messages.
fn append_batch(dataset: &mut PreparedDataset, batch: &RecordBatch, offset: usize) -> Result<()> {
    let templates = column(batch, "template")?
        .as_any()
        .downcast_ref::<StringArray>()
        .context("'template' column is not Utf8")?;
    let heights = column(batch, "height")?
        .as_any()
        .downcast_ref::<Int64Array>()
        .context("'height' column is not Int64")?;
    let widths = column(batch, "width")?
        .as_any()
        .downcast_ref::<Int64Array>()
        .context("'width' column is not Int64")?;
    let image_col = column(batch, "image")?;
    let label_col = column(batch, "label")?;

    for i in 0..batch.num_rows() {
        let row = offset + i;
        let template = parse_template(templates.value(i), row)?;
        let height = usize::try_from(heights.value(i))
            .with_context(|| format!("Row {row}: negative height"))?;
        let width = usize::try_from(widths.value(i))
            .with_context(|| format!("Row {row}: negative width"))?;

        let image = extract_f32_list(image_col, i)
            .with_context(|| format!("Row {row}: failed to read 'image'"))?;
        let label = extract_f32_list(label_col, i)
            .with_context(|| format!("Row {row}: failed to read 'label'"))?;

        let image = Array3::from_shape_vec((height, width, 1), image)
            .with_context(|| format!("Row {row}: 'image' does not match {height}x{width}"))?;
        let label = Array3::from_shape_vec((height, width, 2), label)
            .with_context(|| format!("Row {row}: 'label' does not match {height}x{width}x2"))?;

        dataset.push(template, image, label);
    }
    Ok(())
}

// -- Parquet / Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Arc<dyn Array>> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

/// Extract a `Vec<f32>` from a List or LargeList column at the given row.
fn extract_f32_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f32>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() else {
        bail!(
            "List inner type is {:?}, expected Float32",
            values_array.data_type()
        )
    };
    if f32_arr.null_count() > 0 {
        bail!("{} null pixel values", f32_arr.null_count());
    }
    Ok(f32_arr.values().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::writer::to_record_batch;
    use std::fs;

    #[test]
    fn json_manifest_preserves_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("manifest.json");
        fs::write(&path, r#"["data/b%s.png", "data/a%s.png"]"#).expect("write manifest");

        let templates = load_manifest(&path).expect("load manifest");
        let texts: Vec<String> = templates.iter().map(|t| t.to_string()).collect();
        assert_eq!(texts, vec!["data/b%s.png", "data/a%s.png"]);
    }

    #[test]
    fn json_manifest_rejects_non_strings() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("manifest.json");
        fs::write(&path, r#"["a%s.png", 3]"#).expect("write manifest");

        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("Entry 1"));
    }

    #[test]
    fn csv_manifest_finds_template_column() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("manifest.csv");
        fs::write(
            &path,
            "image,template\nx_image.png,x%s.png\ny_image.png,y%s.png\n",
        )
        .expect("write manifest");

        let templates = load_manifest(&path).expect("load manifest");
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[1].resolve("_label"), Path::new("y_label.png"));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("manifest.json");
        fs::write(&path, r#"["plain.png"]"#).expect("write manifest");

        assert!(load_manifest(&path).is_err());
    }

    fn one_pair(stem: &str, label_channels: usize) -> PreparedDataset {
        let mut dataset = PreparedDataset::default();
        dataset.push(
            FilenameTemplate::parse(&format!("{stem}%s.png")).expect("template"),
            Array3::zeros((2, 2, 1)),
            Array3::zeros((2, 2, label_channels)),
        );
        dataset
    }

    #[test]
    fn row_numbers_continue_across_batches() {
        let first = to_record_batch(&one_pair("a", 2)).expect("first batch");
        let second = to_record_batch(&one_pair("b", 1)).expect("second batch");

        let mut dataset = PreparedDataset::default();
        append_batch(&mut dataset, &first, 0).expect("good batch");
        let err = append_batch(&mut dataset, &second, first.num_rows()).unwrap_err();

        assert_eq!(dataset.len(), 1);
        assert!(err.to_string().starts_with("Row 1:"), "{err:#}");
    }

    #[test]
    fn unknown_manifest_extension_is_rejected() {
        let err = load_manifest(Path::new("list.yaml")).unwrap_err();
        assert!(err.to_string().contains(".yaml"));
    }
}
