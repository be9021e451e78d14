use super::ScanContext;
use crate::{
    error::{AppError, Result},
    models::ScanReport,
    pipeline::{Step, StepFlow},
    utils::{write_atomic, Logger},
};
use anyhow::Context;
use std::path::{Path, PathBuf};

/// `<dir>/weekend-scan-<as_of>.csv` and `.json`
pub fn report_paths(output_dir: &Path, report: &ScanReport) -> (PathBuf, PathBuf) {
    let stem = format!("weekend-scan-{}", report.as_of.format("%Y-%m-%d"));
    (
        output_dir.join(format!("{}.csv", stem)),
        output_dir.join(format!("{}.json", stem)),
    )
}

pub fn write_report_csv(path: &Path, report: &ScanReport) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &report.rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Io(format!("Failed to flush CSV: {}", e)))?;
    write_atomic(path, &bytes)
}

pub fn write_report_json(path: &Path, report: &ScanReport) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(report)?;
    write_atomic(path, &bytes)
}

/// Persist the scan report as CSV and JSON
pub struct WriteReport {
    logger: Logger,
}

impl WriteReport {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("WRITE_REPORT"),
        }
    }
}

impl Default for WriteReport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Step<ScanContext> for WriteReport {
    fn name(&self) -> &'static str {
        "WRITE_REPORT"
    }

    async fn run(&mut self, context: &mut ScanContext) -> anyhow::Result<StepFlow> {
        let report = context
            .report
            .as_ref()
            .context("no report to write; ANALYZE_STOCKS must run first")?;

        let (csv_path, json_path) = report_paths(&context.options.output_dir, report);
        write_report_csv(&csv_path, report)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
        write_report_json(&json_path, report)
            .with_context(|| format!("failed to write {}", json_path.display()))?;

        self.logger.info(&format!(
            "Report written to {} and {}",
            csv_path.display(),
            json_path.display()
        ));
        context.report_csv = Some(csv_path);
        context.report_json = Some(json_path);
        Ok(StepFlow::Continue)
    }
}
