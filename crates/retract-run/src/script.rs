use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use retract_model::{QueryOp, RetractionQuery, TableRef, WriteDisposition};
use retract_warehouse::{QueryExecutor, QueryOutcome, WarehouseError};

use crate::error::{Result, RunError};

/// Renders retraction statements into a reviewable SQL script instead of
/// submitting them to a live warehouse. Sandbox copies, which a warehouse
/// client expresses through job configuration, are rendered as standalone
/// DDL/DML so the script runs as-is.
pub struct ScriptExecutor {
    path: PathBuf,
    writer: BufWriter<File>,
    statements: usize,
}

impl ScriptExecutor {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| RunError::Warehouse(
            WarehouseError::Io(source),
        ))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            statements: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn statement_count(&self) -> usize {
        self.statements
    }

    /// Flush and close the script, returning how many statements it holds.
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .map_err(|source| RunError::Warehouse(WarehouseError::Io(source)))?;
        Ok(self.statements)
    }

    fn write_statement(&mut self, statement: &str) -> std::io::Result<()> {
        writeln!(self.writer, "{statement};")?;
        writeln!(self.writer)?;
        self.statements += 1;
        Ok(())
    }
}

impl QueryExecutor for ScriptExecutor {
    fn execute(
        &mut self,
        query: &RetractionQuery,
    ) -> std::result::Result<QueryOutcome, WarehouseError> {
        let statement = match (query.op, query.destination.as_ref()) {
            (QueryOp::SelectInto, Some(destination)) => {
                let destination_ref = TableRef::new(
                    query.target.project.clone(),
                    destination.dataset.clone(),
                    destination.table.clone(),
                );
                match destination.disposition {
                    WriteDisposition::Truncate => format!(
                        "CREATE OR REPLACE TABLE `{destination_ref}` AS\n{}",
                        query.sql
                    ),
                    WriteDisposition::Append => {
                        format!("INSERT INTO `{destination_ref}`\n{}", query.sql)
                    }
                }
            }
            _ => query.sql.clone(),
        };
        self.write_statement(&statement)?;
        Ok(QueryOutcome {
            job_id: format!("script_{:06}", self.statements),
            affected_rows: None,
        })
    }

    fn drop_table(&mut self, table: &TableRef) -> std::result::Result<(), WarehouseError> {
        let statement = format!("DROP TABLE `{table}`");
        self.write_statement(&statement)?;
        Ok(())
    }
}
