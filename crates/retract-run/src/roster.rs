use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;

use crate::error::{Result, RunError};

/// One deactivated participant: the boundary condition for date-bounded
/// retraction. `research_id` is absent until de-identification has run for
/// the pid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivationRecord {
    pub person_id: i64,
    pub research_id: Option<i64>,
    pub deactivated_date: NaiveDate,
}

/// Load a deactivation roster CSV with header
/// `person_id,research_id,deactivated_date`.
pub fn load_roster(path: &Path) -> Result<Vec<DeactivationRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| RunError::RosterIo {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| RunError::RosterIo {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .ok_or_else(|| RunError::RosterColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let person_idx = column("person_id")?;
    let research_idx = column("research_id")?;
    let date_idx = column("deactivated_date")?;

    let mut roster = Vec::new();
    for (number, record) in reader.records().enumerate() {
        let record = record.map_err(|source| RunError::RosterIo {
            path: path.to_path_buf(),
            source,
        })?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();
        let bad_record = |message: String| RunError::RosterRecord {
            path: path.to_path_buf(),
            record: number + 1,
            message,
        };

        let person_id = field(person_idx)
            .parse::<i64>()
            .map_err(|_| bad_record(format!("invalid person_id '{}'", field(person_idx))))?;
        let research_field = field(research_idx);
        let research_id = if research_field.is_empty() {
            None
        } else {
            Some(
                research_field
                    .parse::<i64>()
                    .map_err(|_| bad_record(format!("invalid research_id '{research_field}'")))?,
            )
        };
        let date_field = field(date_idx);
        let deactivated_date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d")
            .map_err(|_| bad_record(format!("invalid deactivated_date '{date_field}'")))?;

        roster.push(DeactivationRecord {
            person_id,
            research_id,
            deactivated_date,
        });
    }
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn roster_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_roster() {
        let file = roster_file(
            "person_id,research_id,deactivated_date\n\
             42,9001,2019-06-01\n\
             77,,2020-02-15\n",
        );
        let roster = load_roster(file.path()).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].person_id, 42);
        assert_eq!(roster[0].research_id, Some(9001));
        assert_eq!(
            roster[0].deactivated_date,
            NaiveDate::from_ymd_opt(2019, 6, 1).unwrap()
        );
        assert_eq!(roster[1].research_id, None);
    }

    #[test]
    fn test_missing_column_fails() {
        let file = roster_file("person_id,deactivated_date\n42,2019-06-01\n");
        assert!(matches!(
            load_roster(file.path()),
            Err(RunError::RosterColumn { column, .. }) if column == "research_id"
        ));
    }

    #[test]
    fn test_bad_date_fails_with_record_number() {
        let file = roster_file(
            "person_id,research_id,deactivated_date\n\
             42,9001,June 2019\n",
        );
        assert!(matches!(
            load_roster(file.path()),
            Err(RunError::RosterRecord { record: 1, .. })
        ));
    }
}
