use retract_model::{
    DatasetCategory, IdGuard, PersonLinkage, RetractionConfig, RetractionScope, TableRule,
};

pub const PERSON_ID: &str = "person_id";
pub const RESEARCH_ID: &str = "research_id";

/// How one table in one dataset is keyed for retraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierStrategy {
    pub id_column: &'static str,
    pub guard: Option<IdGuard>,
}

/// The identifier column pid expressions bind to in this dataset category.
pub fn category_id_column(category: DatasetCategory) -> &'static str {
    if category.uses_research_id() {
        RESEARCH_ID
    } else {
        PERSON_ID
    }
}

/// Resolve the identifier strategy for a directly person-linked table, or
/// `None` when the table is out of scope for this (category, scope).
///
/// The invariant encoded here: retraction scope never crosses the RDR/EHR
/// provenance boundary unless the caller asked for `RdrAndEhr`.
///
/// - De-identified and release datasets key on `research_id`; the whole
///   research id space is in scope, so no guard.
/// - `person` and `death` rows in merged datasets come from the registry
///   and are only touched under `RdrAndEhr`. In raw and unioned EHR
///   datasets the same tables hold site-submitted rows and are always in
///   scope.
/// - All other combined-dataset tables carry the registry-range guard under
///   `OnlyEhr`: a surrogate id at or below `2 * id_constant_factor` marks a
///   registry-origin row that EHR-scoped retraction must not delete.
pub fn resolve_identifier(
    config: &RetractionConfig,
    category: DatasetCategory,
    scope: RetractionScope,
    rule: &TableRule,
) -> Option<IdentifierStrategy> {
    if rule.linkage != PersonLinkage::Direct {
        return None;
    }
    let id_column = category_id_column(category);
    if rule.rdr_sourced {
        let site_sourced = matches!(category, DatasetCategory::Ehr | DatasetCategory::UnionedEhr);
        if !site_sourced && scope == RetractionScope::OnlyEhr {
            return None;
        }
        return Some(IdentifierStrategy {
            id_column,
            guard: None,
        });
    }
    let guard = match (category, scope) {
        (DatasetCategory::Combined, RetractionScope::OnlyEhr) => Some(IdGuard {
            column: rule.surrogate_id_column(),
            threshold: config.id_guard_threshold(),
        }),
        _ => None,
    };
    Some(IdentifierStrategy { id_column, guard })
}
