use serde::{Deserialize, Serialize};

/// How rows of a table link back to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonLinkage {
    /// The table carries a `person_id` column directly.
    Direct,
    /// `fact_relationship`: the person reference can sit in either
    /// `fact_id_1` or `fact_id_2`, tagged by the matching
    /// `domain_concept_id_{1,2}`.
    FactRelationship,
    /// No person linkage (location, care_site, provider); never retracted
    /// by pid.
    None,
}

/// Position of the participant identifier in a submitted CSV row.
///
/// Person-keyed tables put `person_id` first; event tables put their own
/// surrogate key first and `person_id` second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidFileColumn {
    First,
    Second,
}

impl PidFileColumn {
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// One table's retraction rule: how it links to a participant, which source
/// system owns its rows, and where its pid sits in a submission file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRule {
    pub name: String,
    pub linkage: PersonLinkage,
    /// Registry-sourced tables (`person`, `death`) are out of scope for
    /// EHR-only retraction in merged datasets.
    #[serde(default)]
    pub rdr_sourced: bool,
    /// Set for tables that appear as flat files in site submission folders.
    #[serde(default)]
    pub file_pid_column: Option<PidFileColumn>,
}

impl TableRule {
    pub(crate) fn direct(name: &str, rdr_sourced: bool, file_pid_column: Option<PidFileColumn>) -> Self {
        Self {
            name: name.to_string(),
            linkage: PersonLinkage::Direct,
            rdr_sourced,
            file_pid_column,
        }
    }

    pub(crate) fn fact_relationship() -> Self {
        Self {
            name: "fact_relationship".to_string(),
            linkage: PersonLinkage::FactRelationship,
            rdr_sourced: false,
            file_pid_column: None,
        }
    }

    pub(crate) fn excluded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            linkage: PersonLinkage::None,
            rdr_sourced: false,
            file_pid_column: None,
        }
    }

    /// The table's surrogate key column (`condition_occurrence_id`, ...),
    /// used for the registry-range guard.
    pub fn surrogate_id_column(&self) -> String {
        format!("{}_id", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surrogate_id_column() {
        let rule = TableRule::direct("condition_occurrence", false, Some(PidFileColumn::Second));
        assert_eq!(rule.surrogate_id_column(), "condition_occurrence_id");
    }

    #[test]
    fn test_file_column_index() {
        assert_eq!(PidFileColumn::First.index(), 0);
        assert_eq!(PidFileColumn::Second.index(), 1);
    }
}
