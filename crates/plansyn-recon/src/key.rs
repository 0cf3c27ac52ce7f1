//! Best-effort grouping keys for planning records.
//!
//! Key collisions are the merge signal: two records deriving the same key
//! are folded into one. There is no uniqueness guarantee and the derivation
//! is deliberately not a designed identity scheme; it is a literal
//! municipality + identifier / title-prefix composition, and records the
//! heuristic cannot key stay isolated rather than merged speculatively.

use plansyn_core::PlanningRecord;
use sha2::{Digest, Sha256};

/// Title tokens considered for the fallback key.
const MAX_TITLE_TOKENS: usize = 3;

/// Hex characters of the record hash kept for the isolation bucket.
const HASH_KEY_LEN: usize = 12;

/// Derive a grouping key for a record.
///
/// - identifier present: `lower(municipality) + "_" + identifier` (the
///   identifier is kept verbatim, matching case and punctuation).
/// - otherwise: municipality joined with the first one to three word
///   tokens of the lowercased title.
/// - neither: `general_` plus a hash of the record's serialized form. Such
///   keys match nothing else by construction; the record stays isolated.
///
/// Never panics and never returns an empty string.
pub fn generate_key(record: &PlanningRecord) -> String {
    let municipality = normalize_municipality(&record.municipality);

    if let Some(identifier) = record.identifier.as_deref() {
        let identifier = identifier.trim();
        if !identifier.is_empty() {
            return format!("{municipality}_{identifier}");
        }
    }

    let tokens = title_tokens(&record.title);
    if !tokens.is_empty() {
        let mut parts = Vec::with_capacity(1 + tokens.len());
        parts.push(municipality);
        parts.extend(tokens);
        return parts.join("_");
    }

    isolation_key(record)
}

fn normalize_municipality(municipality: &str) -> String {
    let trimmed = municipality.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// First 1-3 word tokens of the lowercased title, `\w+`-style.
fn title_tokens(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|token| !token.is_empty())
        .take(MAX_TITLE_TOKENS)
        .map(str::to_string)
        .collect()
}

/// Hash-based bucket for records with no usable identifier or title.
fn isolation_key(record: &PlanningRecord) -> String {
    let serialized = serde_json::to_string(record).unwrap_or_else(|_| format!("{record:?}"));
    let digest = Sha256::digest(serialized.as_bytes());
    let hash = hex::encode(digest);
    format!("general_{}", &hash[..HASH_KEY_LEN])
}

/// True for keys from the hash-based isolation bucket.
pub fn is_isolation_key(key: &str) -> bool {
    key.starts_with("general_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansyn_core::{RawRecord, SourceTag};

    fn record(
        source: SourceTag,
        identifier: Option<&str>,
        title: &str,
        municipality: &str,
    ) -> PlanningRecord {
        let mut raw = RawRecord::new(source)
            .with_title(title)
            .with_municipality(municipality);
        if let Some(id) = identifier {
            raw = raw.with_identifier(id);
        }
        PlanningRecord::from_raw(raw)
    }

    #[test]
    fn identifier_key_keeps_identifier_verbatim() {
        let rec = record(SourceTag::OsloOrigo, Some("OSL-001"), "Frogner Park Plan", "Oslo");
        assert_eq!(generate_key(&rec), "oslo_OSL-001");
    }

    #[test]
    fn title_key_uses_first_three_tokens() {
        let rec = record(
            SourceTag::Geonorge,
            None,
            "Reguleringsplan Frogner Park omr. 4",
            "Oslo",
        );
        assert_eq!(generate_key(&rec), "oslo_reguleringsplan_frogner_park");
    }

    #[test]
    fn norwegian_letters_survive_tokenization() {
        let rec = record(SourceTag::Geonorge, None, "Områderegulering Økern", "Oslo");
        assert_eq!(generate_key(&rec), "oslo_områderegulering_økern");
    }

    #[test]
    fn missing_municipality_degrades_to_unknown() {
        let rec = record(SourceTag::Geonorge, None, "Reguleringsplan Sentrum", "");
        assert_eq!(generate_key(&rec), "unknown_reguleringsplan_sentrum");
    }

    #[test]
    fn bare_record_lands_in_isolation_bucket() {
        let rec = record(SourceTag::PdfExtract, None, "", "");
        let key = generate_key(&rec);
        assert!(is_isolation_key(&key), "got {key}");
        assert!(!key.is_empty());
        // deterministic for the same record
        assert_eq!(key, generate_key(&rec));
    }

    #[test]
    fn punctuation_only_title_is_not_a_stable_token() {
        let rec = record(SourceTag::PdfExtract, None, "--- !!! ---", "");
        assert!(is_isolation_key(&generate_key(&rec)));
    }

    #[test]
    fn never_empty_for_any_shape() {
        let shapes = [
            record(SourceTag::Geonorge, Some("x"), "", ""),
            record(SourceTag::Geonorge, None, "t", ""),
            record(SourceTag::Geonorge, None, "", "Bergen"),
            record(SourceTag::Geonorge, None, "", ""),
        ];
        for rec in &shapes {
            assert!(!generate_key(rec).is_empty());
        }
    }

    #[test]
    fn municipality_only_record_is_isolated_not_bare_key() {
        // A record carrying only "Oslo" must not claim the whole
        // municipality bucket for itself.
        let rec = record(SourceTag::PdfExtract, None, "", "Oslo");
        assert!(is_isolation_key(&generate_key(&rec)));
    }
}
