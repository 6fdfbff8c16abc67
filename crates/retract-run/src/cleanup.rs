use tracing::{debug, info};

use retract_model::TableRef;
use retract_warehouse::{QueryExecutor, WarehouseCatalog, WarehouseError};

use crate::error::Result;

/// Drop sandbox tables that no statement actually populated, so a run
/// leaves no hollow artifacts behind. Tables that were never created are
/// ignored; any other catalog error propagates.
pub fn drop_empty_sandbox_tables(
    catalog: &dyn WarehouseCatalog,
    executor: &mut dyn QueryExecutor,
    project: &str,
    sandbox_dataset: &str,
    tables: &[String],
) -> Result<Vec<String>> {
    let mut dropped = Vec::new();
    for table in tables {
        let table_ref = TableRef::new(project, sandbox_dataset, table);
        let row_count = match catalog.table_row_count(&table_ref) {
            Ok(count) => count,
            Err(WarehouseError::TableNotFound { .. }) => {
                debug!(table = %table_ref, "sandbox table never created");
                continue;
            }
            Err(error) => return Err(error.into()),
        };
        if row_count == 0 {
            executor.drop_table(&table_ref)?;
            info!(table = %table_ref, "empty sandbox table dropped");
            dropped.push(table.clone());
        }
    }
    Ok(dropped)
}
