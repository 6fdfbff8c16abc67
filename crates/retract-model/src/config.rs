use serde::{Deserialize, Serialize};

use crate::tables::{PersonLinkage, PidFileColumn, TableRule};

/// Explicit retraction configuration.
///
/// Carries the id-constant factor, the person domain concept id, and the
/// table taxonomy as data rather than module-level constants, so alternate
/// id schemes or taxonomies can be substituted per deployment without
/// editing source. `Default` encodes the OMOP CDM layout; a JSON file with
/// the same shape overrides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetractionConfig {
    /// Site offset unit for surrogate ids. Registry-origin rows are
    /// assigned ids at or below twice this factor; EHR-origin rows above.
    pub id_constant_factor: i64,
    /// OMOP concept id tagging a person reference in `fact_relationship`.
    pub person_domain_concept_id: i64,
    /// Table taxonomy, in statement-emission order.
    pub tables: Vec<TableRule>,
}

impl Default for RetractionConfig {
    fn default() -> Self {
        Self {
            id_constant_factor: 1_000_000_000_000,
            person_domain_concept_id: 56,
            tables: vec![
                TableRule::direct("person", true, Some(PidFileColumn::First)),
                TableRule::direct("death", true, Some(PidFileColumn::First)),
                TableRule::direct("visit_occurrence", false, Some(PidFileColumn::Second)),
                TableRule::direct("condition_occurrence", false, Some(PidFileColumn::Second)),
                TableRule::direct("drug_exposure", false, Some(PidFileColumn::Second)),
                TableRule::direct("measurement", false, Some(PidFileColumn::Second)),
                TableRule::direct("procedure_occurrence", false, Some(PidFileColumn::Second)),
                TableRule::direct("observation", false, Some(PidFileColumn::Second)),
                TableRule::direct("device_exposure", false, Some(PidFileColumn::Second)),
                TableRule::direct("specimen", false, Some(PidFileColumn::Second)),
                TableRule::direct("note", false, Some(PidFileColumn::Second)),
                TableRule::fact_relationship(),
                TableRule::direct("pii_name", false, Some(PidFileColumn::First)),
                TableRule::direct("pii_email", false, Some(PidFileColumn::First)),
                TableRule::direct("pii_phone_number", false, Some(PidFileColumn::First)),
                TableRule::direct("pii_address", false, Some(PidFileColumn::First)),
                TableRule::direct("pii_mrn", false, Some(PidFileColumn::First)),
                TableRule::excluded("location"),
                TableRule::excluded("care_site"),
                TableRule::excluded("provider"),
            ],
        }
    }
}

impl RetractionConfig {
    /// Look up a table rule by name (case-insensitive).
    pub fn rule(&self, name: &str) -> Option<&TableRule> {
        self.tables
            .iter()
            .find(|rule| rule.name.eq_ignore_ascii_case(name))
    }

    /// Tables subject to pid-scoped retraction, in emission order.
    pub fn retraction_tables(&self) -> impl Iterator<Item = &TableRule> {
        self.tables
            .iter()
            .filter(|rule| rule.linkage != PersonLinkage::None)
    }

    /// Rule for a submission file, matched on the file's base name.
    /// Only tables with a known pid column position are file-retractable.
    pub fn file_rule(&self, file_stem: &str) -> Option<&TableRule> {
        self.rule(file_stem)
            .filter(|rule| rule.file_pid_column.is_some())
    }

    /// Surrogate ids above this threshold are EHR-origin.
    pub fn id_guard_threshold(&self) -> i64 {
        2 * self.id_constant_factor
    }
}
