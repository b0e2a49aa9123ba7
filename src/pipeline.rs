// src/pipeline.rs

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::config::{PartnerConfig, PartnerConfigs};
use crate::error::Result;
use crate::output::{render_preview, write_dataset};
use crate::reader::read_delimited;
use crate::session::Session;
use crate::standardize::{canonical_schema, standardize};
use crate::table::{Frame, Tabular};

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub app_name: String,
    pub config_path: PathBuf,
    /// Base for relative `source_path`s and for partners without one.
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub preview_rows: usize,
    /// Worker threads for row-level work; 0 means one per CPU.
    pub threads: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            app_name: "Eligibility Pipeline".to_string(),
            config_path: PathBuf::from("config/partners_config.json"),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output/unified_eligibility"),
            preview_rows: 20,
            threads: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerSummary {
    pub partner_id: String,
    pub source: PathBuf,
    pub rows_read: usize,
    pub rows_kept: usize,
}

#[derive(Debug)]
pub struct RunSummary {
    pub partners: Vec<PartnerSummary>,
    pub rows_written: usize,
    pub part_file: PathBuf,
}

/// `source_path` if configured (relative to `data_dir`), else `<data_dir>/<partner_id>.csv`.
pub fn resolve_source(data_dir: &Path, partner_id: &str, config: &PartnerConfig) -> PathBuf {
    match &config.source_path {
        Some(p) if p.is_absolute() => p.clone(),
        Some(p) => data_dir.join(p),
        None => data_dir.join(format!("{partner_id}.csv")),
    }
}

/// Read and standardize every partner in config order, unioning by column name.
pub fn unify(configs: &PartnerConfigs, data_dir: &Path) -> Result<(Frame, Vec<PartnerSummary>)> {
    let mut unified: Option<Frame> = None;
    let mut summaries = Vec::with_capacity(configs.len());

    for (partner_id, config) in configs.iter() {
        let source = resolve_source(data_dir, partner_id, config);
        info!(partner = %partner_id, source = %source.display(), "processing partner");

        let raw = read_delimited(&source, config.delimiter)?;
        let rows_read = raw.num_rows();
        let standardized = standardize(raw, config)?;
        let rows_kept = standardized.num_rows();
        info!(partner = %partner_id, rows_read, rows_kept, "standardized");

        unified = Some(match unified {
            None => standardized,
            Some(acc) => acc.union_by_name(standardized)?,
        });
        summaries.push(PartnerSummary {
            partner_id: partner_id.to_string(),
            source,
            rows_read,
            rows_kept,
        });
    }

    let unified = unified.unwrap_or_else(|| Frame::empty(canonical_schema()));
    Ok((unified, summaries))
}

/// Run the whole job: load config, unify all partners, overwrite the output dataset and
/// print a preview. Any error aborts before the output is touched.
pub fn run(settings: &PipelineSettings) -> Result<RunSummary> {
    let start = Instant::now();
    let session = Session::start(&settings.app_name, settings.threads)?;

    let configs = PartnerConfigs::load(&settings.config_path)?;
    let (unified, partners) = session.install(|| unify(&configs, &settings.data_dir))?;

    let part_file = write_dataset(&unified, &settings.output_dir)?;
    println!("{}", render_preview(&unified, settings.preview_rows)?);

    info!(
        app = %session.app_name(),
        partners = partners.len(),
        rows = unified.num_rows(),
        elapsed = ?start.elapsed(),
        "run complete"
    );
    Ok(RunSummary {
        partners,
        rows_written: unified.num_rows(),
        part_file,
    })
}
