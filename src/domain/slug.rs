//! Deterministic, human-friendly slug derivation and normalization.
//!
//! Canonical slugs are derived from titles via the `slug` crate. The
//! normalization helpers exist for request-time resolution: an inbound path
//! segment may differ from the canonical slug in case or in separator style,
//! and the resolver retries a small deterministic set of variations before
//! falling back to the content store.

use slug::slugify;
use thiserror::Error;

/// Errors that can occur while deriving a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive the canonical slug for the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Lower-case an inbound path segment and strip surrounding separators.
pub fn normalize(raw: &str) -> String {
    raw.trim().trim_matches('/').to_ascii_lowercase()
}

/// The deterministic variation set tried against the artifact store when the
/// raw segment misses: the normalized form, then separator swaps in both
/// directions. Duplicates and the raw input itself are omitted.
pub fn variations(raw: &str) -> Vec<String> {
    let normalized = normalize(raw);
    let mut out = Vec::with_capacity(3);
    for candidate in [
        normalized.clone(),
        normalized.replace('_', "-"),
        normalized.replace('-', "_"),
    ] {
        if candidate != raw && !candidate.is_empty() && !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// Whether two slugs are equal once case and separator style are ignored.
pub fn matches_normalized(requested: &str, canonical: &str) -> bool {
    normalize(requested).replace('_', "-") == normalize(canonical).replace('_', "-")
}

/// Whether a path segment looks like a canonical slug (`[a-z0-9-]+`).
///
/// This is stricter than what the resolver will retry; the navigation
/// interceptor uses it to decide that a path is content-shaped at all.
pub fn is_plausible_slug(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        assert_eq!(derive_slug("Best Slots Tips").unwrap(), "best-slots-tips");
    }

    #[test]
    fn derive_slug_rejects_empty_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn derive_slug_rejects_unrepresentable_input() {
        assert_eq!(
            derive_slug("!!!"),
            Err(SlugError::Unrepresentable {
                input: "!!!".to_string()
            })
        );
    }

    #[test]
    fn variations_cover_case_and_separator_swaps() {
        let vars = variations("Best-Slots_Tips");
        assert_eq!(
            vars,
            vec![
                "best-slots_tips".to_string(),
                "best-slots-tips".to_string(),
                "best_slots_tips".to_string(),
            ]
        );
    }

    #[test]
    fn variations_omit_the_raw_segment() {
        assert!(!variations("already-canonical").contains(&"already-canonical".to_string()));
    }

    #[test]
    fn matches_normalized_ignores_case_and_separators() {
        assert!(matches_normalized("Best-Slots-Tips", "best-slots-tips"));
        assert!(matches_normalized("best_slots_tips", "best-slots-tips"));
        assert!(!matches_normalized("other-slug", "best-slots-tips"));
    }

    #[test]
    fn plausible_slug_is_strict() {
        assert!(is_plausible_slug("best-slots-tips"));
        assert!(is_plausible_slug("a1-b2"));
        assert!(!is_plausible_slug("Best-Slots-Tips"));
        assert!(!is_plausible_slug("with.dot"));
        assert!(!is_plausible_slug(""));
    }
}
