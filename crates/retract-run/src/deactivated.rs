use std::collections::BTreeSet;

use tracing::{debug, warn};

use retract_model::{
    DatasetCategory, Destination, PersonLinkage, RetractionConfig, RetractionQuery, RowCondition,
    TableRef, WriteDisposition,
};
use retract_plan::{PERSON_ID, RESEARCH_ID};
use retract_warehouse::{ColumnType, WarehouseCatalog};

use crate::error::Result;
use crate::roster::DeactivationRecord;
use crate::rule::CleaningRule;

/// Which date column gates deactivation filtering for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    /// A single unqualified date column: records dated after deactivation.
    Single { column: String },
    /// A start/end pair: any record whose span extends past deactivation is
    /// in scope, even if it started before.
    Range {
        start_column: String,
        end_column: String,
    },
}

impl DateFilter {
    /// The column compared against the deactivation date.
    pub fn cutoff_column(&self) -> &str {
        match self {
            Self::Single { column } => column,
            Self::Range { end_column, .. } => end_column,
        }
    }
}

/// One (dataset, table) pair eligible for date-bounded retraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetractionInfoRow {
    pub dataset: String,
    pub table: String,
    pub filter: DateFilter,
}

/// Sweep the project's column catalog for tables that carry a `person_id`
/// column and classify their date columns.
///
/// Unlike ad hoc pid retraction, this sweep is meant to run unattended
/// across every dataset: a dataset whose catalog cannot be read is logged
/// and skipped, not fatal.
pub fn discover_retraction_info(
    catalog: &dyn WarehouseCatalog,
    project: &str,
    config: &RetractionConfig,
    datasets: Option<&[String]>,
) -> Result<Vec<RetractionInfoRow>> {
    let dataset_ids: Vec<String> = match datasets {
        Some(ids) => ids.to_vec(),
        None => catalog.list_datasets(project)?,
    };
    let mut info = Vec::new();
    for dataset in &dataset_ids {
        match analyze_dataset(catalog, project, dataset, config) {
            Ok(rows) => info.extend(rows),
            Err(error) => {
                warn!(dataset = %dataset, error = %error, "dataset could not be analyzed; skipping");
            }
        }
    }
    Ok(info)
}

fn analyze_dataset(
    catalog: &dyn WarehouseCatalog,
    project: &str,
    dataset: &str,
    config: &RetractionConfig,
) -> Result<Vec<RetractionInfoRow>> {
    let mut rows = Vec::new();
    for table in catalog.list_tables(project, dataset)? {
        // person and death are handled by direct row deletion elsewhere;
        // they are not date-range-filterable the same way.
        if let Some(rule) = config.rule(&table) {
            if rule.rdr_sourced && rule.linkage == PersonLinkage::Direct {
                continue;
            }
        }
        let columns = catalog.table_columns(&TableRef::new(project, dataset, &table))?;
        let has_person_id = columns
            .iter()
            .any(|column| column.name.eq_ignore_ascii_case(PERSON_ID));
        if !has_person_id {
            continue;
        }
        let date_columns: Vec<String> = columns
            .iter()
            .filter(|column| column.column_type == ColumnType::Date)
            .map(|column| column.name.clone())
            .collect();
        match classify_date_columns(&date_columns) {
            Some(filter) => rows.push(RetractionInfoRow {
                dataset: dataset.to_string(),
                table,
                filter,
            }),
            None => {
                debug!(dataset, table = %table, "no date columns; table skipped");
            }
        }
    }
    Ok(rows)
}

/// Classify a table's date columns into a single-date filter or a
/// start/end range filter.
fn classify_date_columns(date_columns: &[String]) -> Option<DateFilter> {
    let start = date_columns
        .iter()
        .find(|column| column.to_lowercase().contains("start_date"));
    let end = date_columns
        .iter()
        .find(|column| column.to_lowercase().contains("end_date"));
    if let (Some(start_column), Some(end_column)) = (start, end) {
        return Some(DateFilter::Range {
            start_column: start_column.clone(),
            end_column: end_column.clone(),
        });
    }
    date_columns
        .iter()
        .find(|column| {
            let lower = column.to_lowercase();
            !lower.contains("start_date") && !lower.contains("end_date")
        })
        .map(|column| DateFilter::Single {
            column: column.clone(),
        })
}

/// Date-bounded retraction for deactivated participants: for every
/// (deactivated pid, eligible table) pair, sandbox then delete the records
/// dated after the participant's deactivation.
pub struct DeactivatedRetractionRule {
    project: String,
    ticket: String,
    sandbox_dataset: String,
    roster: Vec<DeactivationRecord>,
    info: Vec<RetractionInfoRow>,
}

impl DeactivatedRetractionRule {
    pub fn new(
        project: &str,
        ticket: &str,
        sandbox_dataset: &str,
        roster: Vec<DeactivationRecord>,
        info: Vec<RetractionInfoRow>,
    ) -> Self {
        Self {
            project: project.to_string(),
            ticket: ticket.to_string(),
            sandbox_dataset: sandbox_dataset.to_string(),
            roster,
            info,
        }
    }

    fn sandbox_table(&self, info_row: &RetractionInfoRow) -> String {
        format!("{}_{}_{}", self.ticket, info_row.dataset, info_row.table)
    }
}

impl CleaningRule for DeactivatedRetractionRule {
    fn name(&self) -> &str {
        "deactivated_retraction"
    }

    fn setup_rule(&mut self, _catalog: &dyn WarehouseCatalog) -> Result<()> {
        debug!(
            roster_count = self.roster.len(),
            table_count = self.info.len(),
            "deactivated retraction ready"
        );
        Ok(())
    }

    fn get_query_specs(&self) -> Result<Vec<RetractionQuery>> {
        let mut queries = Vec::new();
        let mut seen_sandbox: BTreeSet<String> = BTreeSet::new();
        let mut skipped_without_research_id = 0usize;

        for info_row in &self.info {
            let category = DatasetCategory::of(&info_row.dataset);
            let sandbox_table = self.sandbox_table(info_row);
            for record in &self.roster {
                let (id_column, person_id) = if category.uses_research_id() {
                    match record.research_id {
                        Some(research_id) => (RESEARCH_ID, research_id),
                        None => {
                            skipped_without_research_id += 1;
                            continue;
                        }
                    }
                } else {
                    (PERSON_ID, record.person_id)
                };
                let condition = RowCondition::DeactivatedAfter {
                    id_column: id_column.to_string(),
                    person_id,
                    date_column: info_row.filter.cutoff_column().to_string(),
                    cutoff: record.deactivated_date,
                };
                let target = TableRef::new(&self.project, &info_row.dataset, &info_row.table);
                // First write per sandbox table replaces stale content from
                // an earlier attempt; later pids append.
                let disposition = if seen_sandbox.insert(sandbox_table.clone()) {
                    WriteDisposition::Truncate
                } else {
                    WriteDisposition::Append
                };
                let destination = Destination {
                    dataset: self.sandbox_dataset.clone(),
                    table: sandbox_table.clone(),
                    disposition,
                };
                queries.push(
                    RetractionQuery::select_into(target.clone(), condition.clone(), destination)
                        .batched(),
                );
                queries.push(RetractionQuery::delete(target, condition).batched());
            }
        }
        if skipped_without_research_id > 0 {
            warn!(
                skipped = skipped_without_research_id,
                "roster records without a research id skipped for de-identified datasets"
            );
        }
        Ok(queries)
    }

    fn get_sandbox_tablenames(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .info
            .iter()
            .map(|info_row| self.sandbox_table(info_row))
            .collect();
        names.into_iter().collect()
    }

    fn validate_rule(&self, _catalog: &dyn WarehouseCatalog) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_single_date_column() {
        let columns = vec!["measurement_date".to_string()];
        assert_eq!(
            classify_date_columns(&columns),
            Some(DateFilter::Single {
                column: "measurement_date".to_string()
            })
        );
    }

    #[test]
    fn test_classify_start_end_pair() {
        let columns = vec![
            "visit_start_date".to_string(),
            "visit_end_date".to_string(),
        ];
        let filter = classify_date_columns(&columns).unwrap();
        assert_eq!(
            filter,
            DateFilter::Range {
                start_column: "visit_start_date".to_string(),
                end_column: "visit_end_date".to_string(),
            }
        );
        assert_eq!(filter.cutoff_column(), "visit_end_date");
    }

    #[test]
    fn test_classify_no_date_columns() {
        assert_eq!(classify_date_columns(&[]), None);
    }
}
