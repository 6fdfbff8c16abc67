//! JSON plan reports: the audit trail a retraction run leaves next to its
//! scripts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use retract_model::{DatasetCategory, RetractionQuery};

/// One dataset's slice of the plan.
#[derive(Debug, Serialize)]
pub struct DatasetPlanReport {
    pub dataset: String,
    pub category: DatasetCategory,
    /// Eligible tables absent from the dataset's catalog listing.
    pub missing_tables: Vec<String>,
    pub queries: Vec<RetractionQuery>,
}

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub project: String,
    pub datasets: Vec<DatasetPlanReport>,
}

impl PlanReport {
    pub fn statement_count(&self) -> usize {
        self.datasets
            .iter()
            .map(|dataset| dataset.queries.len())
            .sum()
    }
}

/// Write the report as pretty-printed JSON, returning the path.
pub fn write_plan_report(output_dir: &Path, name: &str, report: &PlanReport) -> Result<PathBuf> {
    let path = output_dir.join(format!("{name}_plan.json"));
    let json = serde_json::to_string_pretty(report).context("serialize plan report")?;
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
