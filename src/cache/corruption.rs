//! Corruption and placeholder detection for cached payloads.
//!
//! A snapshot that would paint a placeholder visibly regresses the page
//! worse than a brief loading state, so matching entries are purged before
//! they ever reach a renderer.

use serde_json::Value;

/// Substrings that identify a placeholder payload. These are the literal
/// signatures the authoring pipeline emits while an item is half-saved.
const PLACEHOLDER_SIGNATURES: &[&str] = &[
    "/assets/img/placeholder",
    "/img/default-thumb",
    "data:image/svg+xml;placeholder",
];

/// Keys whose string values are media URLs.
const MEDIA_KEYS: &[&str] = &["image", "hero_image", "thumbnail"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionReason {
    PlaceholderSignature,
    EmptyTitle,
    RelativeMediaUrl,
}

impl CorruptionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CorruptionReason::PlaceholderSignature => "placeholder_signature",
            CorruptionReason::EmptyTitle => "empty_title",
            CorruptionReason::RelativeMediaUrl => "relative_media_url",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CorruptionPolicy {
    /// Whether media URLs in this surface's payloads must be absolute.
    pub require_absolute_media: bool,
}

/// Scan a payload for corruption signatures. Returns the first reason
/// found, or `None` for a payload safe to hand to a renderer.
pub fn scan(payload: &Value, policy: CorruptionPolicy) -> Option<CorruptionReason> {
    match payload {
        Value::Object(map) => {
            for (key, value) in map {
                if let Value::String(text) = value {
                    if has_placeholder_signature(text) {
                        return Some(CorruptionReason::PlaceholderSignature);
                    }
                    if key == "title" && text.trim().is_empty() {
                        return Some(CorruptionReason::EmptyTitle);
                    }
                    if policy.require_absolute_media
                        && MEDIA_KEYS.contains(&key.as_str())
                        && !text.is_empty()
                        && !is_absolute_url(text)
                    {
                        return Some(CorruptionReason::RelativeMediaUrl);
                    }
                }
                if let Some(reason) = scan(value, policy) {
                    return Some(reason);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| scan(item, policy)),
        Value::String(text) if has_placeholder_signature(text) => {
            Some(CorruptionReason::PlaceholderSignature)
        }
        _ => None,
    }
}

fn has_placeholder_signature(text: &str) -> bool {
    PLACEHOLDER_SIGNATURES
        .iter()
        .any(|signature| text.contains(signature))
}

fn is_absolute_url(text: &str) -> bool {
    text.starts_with("https://") || text.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STRICT: CorruptionPolicy = CorruptionPolicy {
        require_absolute_media: true,
    };
    const LAX: CorruptionPolicy = CorruptionPolicy {
        require_absolute_media: false,
    };

    #[test]
    fn clean_payload_passes() {
        let payload = json!([{
            "title": "Best Slots Tips",
            "image": "https://cdn.example.com/hero.jpg",
        }]);
        assert_eq!(scan(&payload, STRICT), None);
    }

    #[test]
    fn placeholder_image_is_flagged() {
        let payload = json!({"image": "https://cdn.example.com/assets/img/placeholder.png"});
        assert_eq!(
            scan(&payload, LAX),
            Some(CorruptionReason::PlaceholderSignature)
        );
    }

    #[test]
    fn empty_title_is_flagged_anywhere_in_the_tree() {
        let payload = json!({"items": [{"title": "ok"}, {"title": "  "}]});
        assert_eq!(scan(&payload, LAX), Some(CorruptionReason::EmptyTitle));
    }

    #[test]
    fn relative_media_url_is_flagged_only_under_strict_policy() {
        let payload = json!({"hero_image": "/uploads/hero.jpg", "title": "x"});
        assert_eq!(
            scan(&payload, STRICT),
            Some(CorruptionReason::RelativeMediaUrl)
        );
        assert_eq!(scan(&payload, LAX), None);
    }

    #[test]
    fn empty_media_value_is_not_a_relative_url() {
        let payload = json!({"image": "", "title": "x"});
        assert_eq!(scan(&payload, STRICT), None);
    }
}
