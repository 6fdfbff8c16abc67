use std::env;

use crate::error::{FilesError, Result};

/// Resolve the bucket for a site: an explicit value wins, then the
/// site-specific `BUCKET_NAME_<HPO_ID>` variable, then the shared
/// `DRC_BUCKET_NAME` default.
pub fn resolve_bucket(hpo_id: &str, explicit: Option<&str>) -> Result<String> {
    if let Some(bucket) = explicit {
        return Ok(bucket.to_string());
    }
    let env_suffix = hpo_id.to_uppercase();
    let site_var = format!("BUCKET_NAME_{env_suffix}");
    for var in [site_var.as_str(), "DRC_BUCKET_NAME"] {
        if let Ok(bucket) = env::var(var) {
            if !bucket.trim().is_empty() {
                return Ok(bucket);
            }
        }
    }
    Err(FilesError::BucketNotConfigured {
        hpo_id: hpo_id.to_string(),
        env_suffix,
    })
}
