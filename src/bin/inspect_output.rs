use anyhow::{bail, Context, Result};
use arrow::{compute::concat_batches, record_batch::RecordBatchReader};
use eligibility::{output::render_preview, pipeline::PipelineSettings, Frame};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{
    env,
    fs::{self, File},
    path::{Path, PathBuf},
};

fn main() -> Result<()> {
    // Optional argument: dataset directory; defaults to the job's output location.
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PipelineSettings::default().output_dir);

    let parts = part_files(&dir)?;
    if parts.is_empty() {
        bail!("no parquet part files under {}", dir.display());
    }

    println!("=== Dataset: {} ===", dir.display());
    for part in &parts {
        inspect_part(part)?;
    }
    Ok(())
}

fn part_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("parquet"))
        .collect();
    parts.sort();
    Ok(parts)
}

/// Print file metadata, flattened columns and a preview of one part file.
fn inspect_part(path: &Path) -> Result<()> {
    let reader = SerializedFileReader::new(File::open(path)?)
        .with_context(|| format!("opening {}", path.display()))?;
    let meta = reader.metadata();
    let file_meta = meta.file_metadata();

    println!();
    println!("--- {} ---", path.display());
    println!(
        "Created by:           {}",
        file_meta.created_by().unwrap_or("<unknown>")
    );
    println!("Total rows:           {}", file_meta.num_rows());
    println!("Number of row groups: {}", meta.num_row_groups());
    println!("File-size on disk:    {} bytes", fs::metadata(path)?.len());

    println!("Columns:");
    for col in file_meta.schema_descr().columns() {
        let logical = col
            .logical_type()
            .as_ref()
            .map_or("<none>".to_string(), |lt| format!("{:?}", lt));
        println!(
            "- {:<15} | Physical: {:<10} | Logical: {}",
            col.name(),
            format!("{:?}", col.physical_type()),
            logical
        );
    }

    let batches = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    let schema = batches.schema();
    let batches = batches.collect::<std::result::Result<Vec<_>, _>>()?;
    let frame = Frame::new(concat_batches(&schema, &batches)?);
    println!("{}", render_preview(&frame, 20)?);
    Ok(())
}
