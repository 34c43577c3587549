//! The navigation gate.
//!
//! Evaluated for top-level navigations only (HTML-accepting GETs). When a
//! request would otherwise surface a transport-level failure for a
//! content-shaped path, the gate decides which rendering shell should
//! attempt resolution instead. It performs no content lookup itself:
//! classification is purely path-shaped, and the shells own the actual
//! resolution.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderValue, Method, Request, StatusCode,
        header::{ACCEPT, CACHE_CONTROL, LOCATION},
    },
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::domain::slug::{is_plausible_slug, normalize};

/// Cache lifetime advertised on shell rewrites.
const REWRITE_CACHE_CONTROL: &str = "public, max-age=60";

/// Single segments that are never article slugs: shells, utility surfaces
/// and operational endpoints.
const BASE_EXCLUDED: &[&str] = &[
    "article", "category", "search", "contact", "admin", "api", "static", "uploads", "healthz",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavDecision {
    /// Known routes, excluded segments and file-extension paths are left
    /// untouched.
    PassThrough,
    CategoryShell { category: String },
    ArticleShell { slug: String },
    HomeShell,
}

pub struct NavigationPolicy {
    excluded: Vec<String>,
}

impl NavigationPolicy {
    pub fn new(extra_excluded: impl IntoIterator<Item = String>) -> Self {
        let mut excluded: Vec<String> = BASE_EXCLUDED.iter().map(|s| s.to_string()).collect();
        excluded.extend(extra_excluded.into_iter().map(|s| normalize(&s)));
        Self { excluded }
    }

    /// Whether a segment names a shell, utility surface or operational
    /// endpoint rather than content.
    pub fn is_excluded(&self, segment: &str) -> bool {
        let candidate = normalize(segment);
        self.excluded.iter().any(|e| e == &candidate)
    }

    /// Classify a path, in priority order: known/static shapes pass
    /// through, two content-shaped segments go to the category shell, one
    /// plausible segment goes to the article shell.
    pub fn classify(&self, path: &str) -> NavDecision {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return NavDecision::PassThrough;
        }

        let segments: Vec<&str> = trimmed.split('/').collect();
        let last = segments[segments.len() - 1];
        if last.contains('.') {
            // File-extension paths belong to the static host.
            return NavDecision::PassThrough;
        }

        match segments.as_slice() {
            [single] => {
                let candidate = normalize(single);
                if self.is_excluded(&candidate) {
                    NavDecision::PassThrough
                } else if is_plausible_slug(&candidate) {
                    NavDecision::ArticleShell { slug: candidate }
                } else {
                    NavDecision::PassThrough
                }
            }
            [category, _slug] => {
                let category = normalize(category);
                if is_plausible_slug(&category) && !self.is_excluded(&category) {
                    NavDecision::CategoryShell { category }
                } else {
                    NavDecision::PassThrough
                }
            }
            _ => NavDecision::PassThrough,
        }
    }
}

fn is_navigation(request: &Request<Body>) -> bool {
    request.method() == Method::GET
        && request
            .headers()
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"))
}

/// Response gate applied to the whole public router. A 404 for a
/// content-shaped navigation is rewritten to the matching shell; on an
/// upstream failure the same heuristic applies, with the home shell as the
/// final fallback. Everything else passes through untouched.
pub async fn navigation_gate(
    State(policy): State<Arc<NavigationPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let gated = is_navigation(&request);
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    if !gated {
        return response;
    }

    let status = response.status();
    if status != StatusCode::NOT_FOUND && !status.is_server_error() {
        return response;
    }

    let mut decision = policy.classify(&path);
    if status.is_server_error() && decision == NavDecision::PassThrough {
        decision = NavDecision::HomeShell;
    }

    let location = match decision {
        NavDecision::PassThrough => return response,
        NavDecision::CategoryShell { category } => format!("/category/{category}"),
        NavDecision::ArticleShell { slug } => format!("/article?slug={slug}"),
        NavDecision::HomeShell => "/".to_string(),
    };

    debug!(
        target = "infra::http::navigation",
        path = path,
        status = status.as_u16(),
        location = location,
        "rewriting failed navigation to shell"
    );
    shell_redirect(&location)
}

fn shell_redirect(location: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(REWRITE_CACHE_CONTROL));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> NavigationPolicy {
        NavigationPolicy::new(vec!["about".to_string()])
    }

    #[test]
    fn file_extension_paths_pass_through() {
        assert_eq!(policy().classify("/favicon.ico"), NavDecision::PassThrough);
        assert_eq!(
            policy().classify("/guides/chart.png"),
            NavDecision::PassThrough
        );
    }

    #[test]
    fn excluded_segments_pass_through() {
        assert_eq!(policy().classify("/search"), NavDecision::PassThrough);
        assert_eq!(policy().classify("/about"), NavDecision::PassThrough);
        assert_eq!(policy().classify("/article"), NavDecision::PassThrough);
    }

    #[test]
    fn plausible_single_segment_goes_to_article_shell() {
        assert_eq!(
            policy().classify("/best-slots-tips"),
            NavDecision::ArticleShell {
                slug: "best-slots-tips".to_string()
            }
        );
    }

    #[test]
    fn case_divergent_segment_is_normalized_first() {
        assert_eq!(
            policy().classify("/Best-Slots-Tips"),
            NavDecision::ArticleShell {
                slug: "best-slots-tips".to_string()
            }
        );
    }

    #[test]
    fn two_content_segments_go_to_category_shell() {
        assert_eq!(
            policy().classify("/guides/best-slots-tips"),
            NavDecision::CategoryShell {
                category: "guides".to_string()
            }
        );
    }

    #[test]
    fn deep_paths_pass_through() {
        assert_eq!(
            policy().classify("/a/b/c"),
            NavDecision::PassThrough
        );
    }

    #[test]
    fn home_passes_through() {
        assert_eq!(policy().classify("/"), NavDecision::PassThrough);
    }
}
