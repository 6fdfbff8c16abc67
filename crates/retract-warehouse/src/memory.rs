use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use retract_model::{PidExpr, QueryOp, RetractionQuery, Row, TableRef, Value, WriteDisposition};

use crate::catalog::{ColumnInfo, WarehouseCatalog};
use crate::error::{Result, WarehouseError};
use crate::executor::{QueryExecutor, QueryOutcome};

/// In-memory warehouse: project -> dataset -> table.
///
/// Doubles as the on-disk catalog-snapshot format (`MemoryWarehouse::load`)
/// and as the executor the tests retract against. Snapshot files may carry
/// columns only (a catalog export) or columns plus rows (a test fixture).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryWarehouse {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectData>,
    #[serde(skip)]
    job_counter: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectData {
    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetData {
    #[serde(default)]
    pub tables: BTreeMap<String, TableData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog snapshot from JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| WarehouseError::SnapshotIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| WarehouseError::SnapshotParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Insert (or replace) a table with its columns and rows.
    pub fn insert_table(
        &mut self,
        table: &TableRef,
        columns: Vec<ColumnInfo>,
        rows: Vec<Row>,
    ) {
        self.projects
            .entry(table.project.clone())
            .or_default()
            .datasets
            .entry(table.dataset.clone())
            .or_default()
            .tables
            .insert(table.table.clone(), TableData { columns, rows });
    }

    pub fn rows(&self, table: &TableRef) -> Option<&Vec<Row>> {
        self.table(table).ok().map(|data| &data.rows)
    }

    fn project(&self, project: &str) -> Result<&ProjectData> {
        self.projects
            .get(project)
            .ok_or_else(|| WarehouseError::ProjectNotFound {
                project: project.to_string(),
            })
    }

    fn dataset(&self, project: &str, dataset: &str) -> Result<&DatasetData> {
        self.project(project)?
            .datasets
            .get(dataset)
            .ok_or_else(|| WarehouseError::DatasetNotFound {
                project: project.to_string(),
                dataset: dataset.to_string(),
            })
    }

    fn table(&self, table: &TableRef) -> Result<&TableData> {
        self.dataset(&table.project, &table.dataset)?
            .tables
            .get(&table.table)
            .ok_or_else(|| WarehouseError::TableNotFound {
                table: table.clone(),
            })
    }

    fn table_mut(&mut self, table: &TableRef) -> Result<&mut TableData> {
        self.projects
            .get_mut(&table.project)
            .and_then(|project| project.datasets.get_mut(&table.dataset))
            .and_then(|dataset| dataset.tables.get_mut(&table.table))
            .ok_or_else(|| WarehouseError::TableNotFound {
                table: table.clone(),
            })
    }

    /// Collect the integer values of one column, for subquery pid sources.
    fn collect_ids(&self, table: &TableRef, id_column: &str) -> Result<BTreeSet<i64>> {
        let data = self.table(table)?;
        Ok(data
            .rows
            .iter()
            .filter_map(|row| row.get(id_column).and_then(Value::as_i64))
            .collect())
    }

    fn resolved_pids(&self, query: &RetractionQuery) -> Result<BTreeSet<i64>> {
        match query.condition.pid_expr() {
            Some(PidExpr::List(pids)) => Ok(pids.iter().copied().collect()),
            Some(PidExpr::Subquery { table, id_column }) => self.collect_ids(table, id_column),
            None => Ok(BTreeSet::new()),
        }
    }

    fn next_job_id(&mut self) -> String {
        self.job_counter += 1;
        format!("mem_{:06}", self.job_counter)
    }
}

impl WarehouseCatalog for MemoryWarehouse {
    fn list_datasets(&self, project: &str) -> Result<Vec<String>> {
        Ok(self.project(project)?.datasets.keys().cloned().collect())
    }

    fn list_tables(&self, project: &str, dataset: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .dataset(project, dataset)?
            .tables
            .keys()
            .cloned()
            .collect())
    }

    fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>> {
        Ok(self.table(table)?.columns.clone())
    }

    fn table_row_count(&self, table: &TableRef) -> Result<u64> {
        Ok(self.table(table)?.rows.len() as u64)
    }
}

impl QueryExecutor for MemoryWarehouse {
    fn execute(&mut self, query: &RetractionQuery) -> Result<QueryOutcome> {
        let pids = self.resolved_pids(query)?;
        let affected = match query.op {
            QueryOp::Delete => {
                let table = self.table_mut(&query.target)?;
                let before = table.rows.len();
                table.rows.retain(|row| !query.condition.matches(row, &pids));
                (before - table.rows.len()) as u64
            }
            QueryOp::SelectInto => {
                let source = self.table(&query.target)?;
                let selected: Vec<Row> = source
                    .rows
                    .iter()
                    .filter(|row| query.condition.matches(row, &pids))
                    .cloned()
                    .collect();
                let columns = source.columns.clone();
                let destination =
                    query
                        .destination
                        .as_ref()
                        .ok_or_else(|| WarehouseError::MissingDestination {
                            table: query.target.clone(),
                        })?;
                let dest_ref = TableRef::new(
                    query.target.project.clone(),
                    destination.dataset.clone(),
                    destination.table.clone(),
                );
                let copied = selected.len() as u64;
                let dataset = self
                    .projects
                    .entry(dest_ref.project.clone())
                    .or_default()
                    .datasets
                    .entry(dest_ref.dataset.clone())
                    .or_default();
                match destination.disposition {
                    WriteDisposition::Truncate => {
                        dataset.tables.insert(
                            dest_ref.table.clone(),
                            TableData {
                                columns,
                                rows: selected,
                            },
                        );
                    }
                    WriteDisposition::Append => {
                        let table = dataset
                            .tables
                            .entry(dest_ref.table.clone())
                            .or_insert_with(|| TableData {
                                columns,
                                rows: Vec::new(),
                            });
                        table.rows.extend(selected);
                    }
                }
                copied
            }
        };
        let job_id = self.next_job_id();
        debug!(job_id = %job_id, target = %query.target, affected_rows = affected, "statement applied");
        Ok(QueryOutcome {
            job_id,
            affected_rows: Some(affected),
        })
    }

    fn drop_table(&mut self, table: &TableRef) -> Result<()> {
        let dataset = self
            .projects
            .get_mut(&table.project)
            .and_then(|project| project.datasets.get_mut(&table.dataset))
            .ok_or_else(|| WarehouseError::DatasetNotFound {
                project: table.project.clone(),
                dataset: table.dataset.clone(),
            })?;
        dataset
            .tables
            .remove(&table.table)
            .ok_or_else(|| WarehouseError::TableNotFound {
                table: table.clone(),
            })?;
        Ok(())
    }
}
