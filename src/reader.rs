// src/reader.rs

use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{fs::File, io::BufReader, path::Path, sync::Arc};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::table::Frame;

const BATCH_ROWS: usize = 64 * 1024;

/// Load a delimited file whose first line is the header.
///
/// Every column is read as a nullable string; empty fields become null. A data row
/// whose field count differs from the header fails the read.
#[tracing::instrument(
    level = "info",
    skip(path),
    fields(path = %path.as_ref().display(), delimiter = %(delimiter as char))
)]
pub fn read_delimited<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Frame> {
    let path = path.as_ref();

    // 1) header only, to name the columns
    let file = File::open(path).map_err(|e| PipelineError::read(path, e))?;
    let (header, _) = Format::default()
        .with_header(true)
        .with_delimiter(delimiter)
        .infer_schema(BufReader::new(file), Some(0))
        .map_err(|e| PipelineError::read(path, e))?;
    let fields: Vec<Field> = header
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    // 2) full read with every column as Utf8
    let file = File::open(path).map_err(|e| PipelineError::read(path, e))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(BATCH_ROWS)
        .build(BufReader::new(file))
        .map_err(|e| PipelineError::read(path, e))?;
    let batches: Vec<RecordBatch> = reader
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| PipelineError::read(path, e))?;

    let batch = concat_batches(&schema, &batches)?;
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "read partner file"
    );
    Ok(Frame::new(batch))
}
