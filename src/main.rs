use anyhow::{Context, Result};
use eligibility::{run, PipelineSettings};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) run with the fixed job layout ────────────────────────────
    let settings = PipelineSettings::default();
    let summary = run(&settings).with_context(|| {
        format!(
            "eligibility run failed (config {})",
            settings.config_path.display()
        )
    })?;

    for p in &summary.partners {
        info!(
            partner = %p.partner_id,
            read = p.rows_read,
            kept = p.rows_kept,
            "partner done"
        );
    }
    info!(
        rows = summary.rows_written,
        path = %summary.part_file.display(),
        "all done"
    );
    Ok(())
}
