//! Validation and wire-boundary helpers shared by the data model (§6).

use regex::Regex;
use std::sync::OnceLock;

const MAX_EVIDENCE_ITEMS: usize = 100;
const MAX_EVIDENCE_ITEM_BYTES: usize = 10 * 1024;
const MAX_DEPENDENCIES: usize = 100;
const MAX_METADATA_BYTES: usize = 100 * 1024;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,254}$").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name does not match the allowed charset")]
    InvalidName,
    #[error("name contains a disallowed sequence")]
    DisallowedSequence,
    #[error("score must be within [0.0, 1.0]")]
    ScoreOutOfRange,
    #[error("evidence item exceeds the per-item size limit")]
    EvidenceItemTooLarge,
    #[error("evidence list exceeds the maximum item count")]
    TooManyEvidenceItems,
    #[error("dependency list exceeds the maximum item count")]
    TooManyDependencies,
    #[error("metadata exceeds the serialized size limit")]
    MetadataTooLarge,
}

/// Validates a module or instance name against `^[A-Za-z0-9][A-Za-z0-9_.\-]{0,254}$`
/// and rejects `..`, `/`, `\` and NUL even where the regex alone would accept them.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(ValidationError::DisallowedSequence);
    }
    if !name_pattern().is_match(name) {
        return Err(ValidationError::InvalidName);
    }
    Ok(())
}

pub fn validate_unit_score(value: f64) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) || value.is_nan() {
        return Err(ValidationError::ScoreOutOfRange);
    }
    Ok(())
}

pub fn validate_evidence(evidence: &[String]) -> Result<(), ValidationError> {
    if evidence.len() > MAX_EVIDENCE_ITEMS {
        return Err(ValidationError::TooManyEvidenceItems);
    }
    for item in evidence {
        if item.len() > MAX_EVIDENCE_ITEM_BYTES {
            return Err(ValidationError::EvidenceItemTooLarge);
        }
    }
    Ok(())
}

pub fn validate_dependencies(dependencies: &[String]) -> Result<(), ValidationError> {
    if dependencies.len() > MAX_DEPENDENCIES {
        return Err(ValidationError::TooManyDependencies);
    }
    for dep in dependencies {
        validate_name(dep)?;
    }
    Ok(())
}

pub fn validate_metadata(metadata: &serde_json::Value) -> Result<(), ValidationError> {
    let serialized = serde_json::to_vec(metadata).map_err(|_| ValidationError::MetadataTooLarge)?;
    if serialized.len() > MAX_METADATA_BYTES {
        return Err(ValidationError::MetadataTooLarge);
    }
    Ok(())
}
