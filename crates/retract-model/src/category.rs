use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pipeline stage a dataset belongs to, inferred from its naming convention.
///
/// The category decides which identifier column keys a participant's rows
/// (`person_id` before de-identification, `research_id` after) and whether
/// EHR-scoped retraction must guard against registry-origin surrogate ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetCategory {
    /// RDR and EHR merged, pre-deid.
    Combined,
    /// All EHR sites merged, no RDR.
    UnionedEhr,
    /// Raw per-site submissions plus their unioned counterparts.
    Ehr,
    /// De-identified variant; pids remapped to research ids.
    Deid,
    /// Published release dataset (de-identified).
    Release,
    /// Unclassifiable; still gets best-effort person_id retraction.
    Other,
}

impl DatasetCategory {
    /// Classify a dataset id by its name tokens.
    ///
    /// Priority matters: "combined_deid" is de-identified, not combined, and
    /// "unioned_ehr" must not fall through to the bare "ehr" token.
    pub fn of(dataset_id: &str) -> Self {
        let name = dataset_id.to_lowercase();
        if name.contains("deid") {
            return Self::Deid;
        }
        if name.contains("release") || release_name_pattern().is_match(&name) {
            return Self::Release;
        }
        if name.contains("combined") {
            return Self::Combined;
        }
        if name.contains("unioned") {
            return Self::UnionedEhr;
        }
        if name.contains("ehr") {
            return Self::Ehr;
        }
        Self::Other
    }

    /// Whether rows in this dataset are keyed by `research_id`.
    pub fn uses_research_id(self) -> bool {
        matches!(self, Self::Deid | Self::Release)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::UnionedEhr => "unioned_ehr",
            Self::Ehr => "ehr",
            Self::Deid => "deid",
            Self::Release => "release",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DatasetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Versioned release names like `r2023q3r4` or `2023q3r2_base`.
fn release_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^r?\d{4}q\dr\d+").expect("release name regex"))
}

/// How far an ad hoc retraction run is allowed to reach.
///
/// `OnlyEhr` confines deletion to site-submitted records; registry-sourced
/// rows (the `person`/`death` tables, and combined-dataset rows whose
/// surrogate ids sit in the registry range) stay untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetractionScope {
    RdrAndEhr,
    OnlyEhr,
}

impl RetractionScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RdrAndEhr => "rdr_and_ehr",
            Self::OnlyEhr => "only_ehr",
        }
    }
}

impl fmt::Display for RetractionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RetractionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rdr_and_ehr" => Ok(Self::RdrAndEhr),
            "only_ehr" => Ok(Self::OnlyEhr),
            _ => Err(format!("unknown retraction scope: {s}")),
        }
    }
}
