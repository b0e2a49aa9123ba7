// src/output.rs

use arrow::util::{display::FormatOptions, pretty::pretty_format_batches_with_options};
use parquet::{
    arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::table::{Frame, Tabular};

pub const PART_FILE: &str = "part-00000.parquet";
pub const SUCCESS_MARKER: &str = "_SUCCESS";

fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Sibling directory the dataset is assembled in before it replaces `dir`.
fn staging_dir(dir: &Path) -> PathBuf {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    dir.with_file_name(format!(".{name}.staging"))
}

/// Write `frame` as a Parquet dataset directory at `dir`, replacing whatever was there.
///
/// The part file and `_SUCCESS` marker are written to a staging directory first, so a
/// failed write leaves the previous dataset untouched.
#[tracing::instrument(level = "info", skip(frame, dir), fields(dir = %dir.as_ref().display(), rows = frame.num_rows()))]
pub fn write_dataset<P: AsRef<Path>>(frame: &Frame, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let staging = staging_dir(dir);

    // 1) fresh staging dir
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(write_err(&staging))?;
    }
    fs::create_dir_all(&staging).map_err(write_err(&staging))?;

    // 2) single part file
    let part = staging.join(PART_FILE);
    let file = File::create(&part).map_err(write_err(&part))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, frame.schema(), Some(props))?;
    writer.write(frame.batch())?;
    writer.close()?;
    debug!(path = %part.display(), "wrote part file");

    let marker = staging.join(SUCCESS_MARKER);
    File::create(&marker).map_err(write_err(&marker))?;

    // 3) swap into place
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(write_err(dir))?;
    }
    fs::rename(&staging, dir).map_err(write_err(dir))?;

    info!("dataset written");
    Ok(dir.join(PART_FILE))
}

/// Untruncated ASCII table of the first `max_rows` rows.
pub fn render_preview(frame: &Frame, max_rows: usize) -> Result<String> {
    let total = frame.num_rows();
    let shown = frame.batch().slice(0, max_rows.min(total));
    let options = FormatOptions::default().with_null("null");
    let mut out = pretty_format_batches_with_options(&[shown], &options)?.to_string();
    if total > max_rows {
        out.push_str(&format!("\nonly showing top {max_rows} rows"));
    }
    Ok(out)
}
