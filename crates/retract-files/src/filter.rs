use std::collections::BTreeSet;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use retract_model::PidFileColumn;

use crate::error::{FilesError, Result};

/// Result of filtering one submission file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub records_kept: usize,
    pub records_removed: usize,
    /// The rewritten file content (header included).
    pub content: Vec<u8>,
}

/// Drop the records whose pid column matches a retracted id.
///
/// The first record is the header and is kept unconditionally. A record is
/// only removed when it has at least two fields and its pid field parses as
/// an integer found in `pids`; anything ambiguous is kept, erring toward
/// not silently deleting data that cannot be tested for membership.
pub fn filter_pid_records(
    path: &str,
    content: &[u8],
    pid_column: PidFileColumn,
    pids: &BTreeSet<i64>,
) -> Result<FilterOutcome> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut output = Vec::new();
    let mut records_kept = 0usize;
    let mut records_removed = 0usize;
    {
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut output);
        let mut first = true;
        for record in reader.records() {
            let record = record.map_err(|source| FilesError::Csv {
                path: path.to_string(),
                source,
            })?;
            if first {
                first = false;
                write_record(&mut writer, path, &record)?;
                continue;
            }
            if should_remove(&record, pid_column, pids) {
                records_removed += 1;
                continue;
            }
            records_kept += 1;
            write_record(&mut writer, path, &record)?;
        }
        writer.flush().map_err(|source| FilesError::Io {
            path: path.to_string(),
            source,
        })?;
    }

    Ok(FilterOutcome {
        records_kept,
        records_removed,
        content: output,
    })
}

fn write_record<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    path: &str,
    record: &StringRecord,
) -> Result<()> {
    writer.write_record(record).map_err(|source| FilesError::Csv {
        path: path.to_string(),
        source,
    })
}

fn should_remove(record: &StringRecord, pid_column: PidFileColumn, pids: &BTreeSet<i64>) -> bool {
    // Too short to test for pid membership; keep it investigable.
    if record.len() < 2 {
        return false;
    }
    let Some(field) = record.get(pid_column.index()) else {
        return false;
    };
    // Strip quote characters a double-quoted export leaves embedded.
    let cleaned = field.trim().trim_matches('"');
    match cleaned.parse::<i64>() {
        Ok(pid) => pids.contains(&pid),
        // Non-numeric identifier: malformed or already-corrupted record;
        // retain rather than silently delete.
        Err(_) => false,
    }
}
