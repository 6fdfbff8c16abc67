use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use retract_model::TableRef;

use crate::error::Result;

/// Column type as the warehouse catalog reports it. Snapshot files carry
/// the warehouse's own spelling ("INT64", "STRING", ...); unknown types
/// collapse to `Other` rather than failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Date,
    Timestamp,
    Other,
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        match value.trim().to_uppercase().as_str() {
            "INTEGER" | "INT64" => Self::Integer,
            "FLOAT" | "FLOAT64" | "NUMERIC" => Self::Float,
            "STRING" | "TEXT" => Self::Text,
            "DATE" => Self::Date,
            "TIMESTAMP" | "DATETIME" => Self::Timestamp,
            _ => Self::Other,
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        match value {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "STRING",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Other => "OTHER",
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnInfo {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

/// Read-only view of the warehouse's metadata catalog.
///
/// No caching anywhere: every call re-lists, and errors surface to the
/// caller untranslated. Whether a failed listing aborts the run or skips
/// the dataset is the caller's policy, not the catalog's.
pub trait WarehouseCatalog {
    fn list_datasets(&self, project: &str) -> Result<Vec<String>>;

    fn list_tables(&self, project: &str, dataset: &str) -> Result<BTreeSet<String>>;

    fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>>;

    fn table_row_count(&self, table: &TableRef) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_parsing() {
        assert_eq!(ColumnType::from("INT64".to_string()), ColumnType::Integer);
        assert_eq!(ColumnType::from("integer".to_string()), ColumnType::Integer);
        assert_eq!(ColumnType::from("DATE".to_string()), ColumnType::Date);
        assert_eq!(ColumnType::from("STRING".to_string()), ColumnType::Text);
        assert_eq!(ColumnType::from("GEOGRAPHY".to_string()), ColumnType::Other);
    }
}
