//! Public routes: slug resolution, rendering shells, site index, health.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, LINK, LOCATION},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        publication::PublicationSync,
        repos::{CategoriesRepo, ContentRepo},
        resolver::{Resolution, ResolveError, SlugResolver},
        site_index::SiteIndexService,
    },
    cache::{SurfaceKey, Surfaces},
    domain::entities::{ContentCard, ContentItemRecord},
    domain::slug::{is_plausible_slug, matches_normalized, normalize},
    domain::types::ContentStatus,
    presentation::views::{
        ArticlePayload, ArticleShellTemplate, ArticleShellView, ArticleView, CardView,
        CategoryPayload, CategoryShellTemplate, CategoryShellView, HomeTemplate, HomeView,
        SiteChrome, render_not_found_response, render_template_response,
    },
};

use super::{
    middleware::{log_responses, set_request_context, strip_trailing_slash},
    navigation::{NavigationPolicy, navigation_gate},
};

const HOME_RECENT_LIMIT: u32 = 10;
const SIDEBAR_LIMIT: u32 = 5;
const CATEGORY_LIMIT: u32 = 20;
const SHELL_SCAN_LIMIT: u32 = 50;

/// Served artifacts sit behind a multi-hour edge cache.
const ARTIFACT_CACHE_CONTROL: &str = "public, max-age=14400";
const INDEX_CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Clone)]
pub struct HttpState {
    pub content: Arc<dyn ContentRepo>,
    pub categories: Arc<dyn CategoriesRepo>,
    pub resolver: Arc<SlugResolver>,
    pub publication: PublicationSync,
    pub site_index: SiteIndexService,
    pub surfaces: Surfaces,
    pub policy: Arc<NavigationPolicy>,
    pub site: SiteChrome,
}

pub fn build_router(state: HttpState) -> Router {
    let policy = Arc::clone(&state.policy);
    let routed = Router::new()
        .route("/", get(home))
        .route("/article", get(article_shell))
        .route("/category/{slug}", get(category_shell))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
        .route("/healthz", get(healthz))
        .route(
            "/hooks/publication",
            axum::routing::post(super::hooks::publication_hook),
        )
        .route("/{slug}", get(resolve_single))
        .route("/{category}/{slug}", get(resolve_nested))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(policy, navigation_gate))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context));

    // `strip_trailing_slash` must run before routing so both path forms land
    // on the same route; middleware attached with `Router::layer` runs after
    // routing, so wrap the routed service in an outer router instead.
    Router::new()
        .fallback_service(routed)
        .layer(middleware::from_fn(strip_trailing_slash))
}

async fn not_found(State(state): State<HttpState>) -> Response {
    render_not_found_response(state.site.clone())
}

// ============================================================================
// Slug resolution endpoints
// ============================================================================

async fn resolve_single(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    respond_resolution(&state, &slug).await
}

async fn resolve_nested(
    State(state): State<HttpState>,
    Path((_category, slug)): Path<(String, String)>,
) -> Response {
    respond_resolution(&state, &slug).await
}

async fn respond_resolution(state: &HttpState, raw: &str) -> Response {
    // Content-shaped segments only; excluded names and everything with an
    // extension belong to other routes or the static host and fall through
    // as a plain 404 for the navigation gate to classify.
    if raw.contains('.') || state.policy.is_excluded(raw) || !is_plausible_slug(&normalize(raw))
    {
        return render_not_found_response(state.site.clone());
    }

    match state.resolver.resolve(raw).await {
        Ok(Resolution::Document {
            html,
            canonical_url,
            etag,
            canonical_in_document,
        }) => {
            let mut response = (StatusCode::OK, html).into_response();
            let headers = response.headers_mut();
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            headers.insert(
                CACHE_CONTROL,
                HeaderValue::from_static(ARTIFACT_CACHE_CONTROL),
            );
            if let Ok(value) = HeaderValue::from_str(&format!("\"{etag}\"")) {
                headers.insert(ETAG, value);
            }
            headers.insert(
                "x-content-type-options",
                HeaderValue::from_static("nosniff"),
            );
            headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
            if !canonical_in_document {
                if let Ok(value) =
                    HeaderValue::from_str(&format!("<{canonical_url}>; rel=\"canonical\""))
                {
                    headers.insert(LINK, value);
                }
            }
            response
        }
        Ok(Resolution::Redirect { location, max_age }) => {
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
            if let Ok(value) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(LOCATION, value);
            }
            if let Ok(value) =
                HeaderValue::from_str(&format!("public, max-age={}", max_age.as_secs()))
            {
                response.headers_mut().insert(CACHE_CONTROL, value);
            }
            response
        }
        // A failed lookup call is a transport failure, not a content miss.
        // The navigation gate still rewrites it to a shell for top-level
        // navigations; the report keeps the diagnosis in the logs.
        Err(err @ ResolveError::Upstream { .. }) => HttpError::from_error(
            "infra::http::respond_resolution",
            StatusCode::BAD_GATEWAY,
            "Content lookup failed",
            &err,
        )
        .into_response(),
    }
}

// ============================================================================
// Rendering shells
// ============================================================================

async fn home(State(state): State<HttpState>) -> Response {
    let hero_surface = state.surfaces.surface(SurfaceKey::HomeHero);
    let recent_surface = state.surfaces.surface(SurfaceKey::HomeRecent);
    let sidebar_surface = state.surfaces.surface(SurfaceKey::SidebarLatest);

    // Independent surfaces, independent refreshes: one failing or slow
    // fetch degrades its own section only.
    let (hero, recent, sidebar) = tokio::join!(
        hero_surface.read_through(|| {
            let content = Arc::clone(&state.content);
            async move {
                let cards = content
                    .list_recent_cards(1)
                    .await
                    .map_err(|e| e.to_string())?;
                serde_json::to_value(cards.into_iter().next()).map_err(|e| e.to_string())
            }
        }),
        recent_surface.read_through(|| {
            let content = Arc::clone(&state.content);
            async move {
                let cards = content
                    .list_recent_cards(HOME_RECENT_LIMIT)
                    .await
                    .map_err(|e| e.to_string())?;
                serde_json::to_value(cards).map_err(|e| e.to_string())
            }
        }),
        sidebar_surface.read_through(|| {
            let content = Arc::clone(&state.content);
            async move {
                let cards = content
                    .list_recent_cards(SIDEBAR_LIMIT)
                    .await
                    .map_err(|e| e.to_string())?;
                serde_json::to_value(cards).map_err(|e| e.to_string())
            }
        }),
    );

    let view = HomeView {
        site: state.site.clone(),
        hero: decode::<Option<ContentCard>>(hero, "home:hero")
            .flatten()
            .map(|card| CardView::from_card(&card)),
        recent: decode::<Vec<ContentCard>>(recent, "home:recent")
            .unwrap_or_default()
            .iter()
            .map(CardView::from_card)
            .collect(),
        sidebar: decode::<Vec<ContentCard>>(sidebar, "sidebar:latest")
            .unwrap_or_default()
            .iter()
            .map(CardView::from_card)
            .collect(),
    };

    render_template_response(HomeTemplate { view }, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleShellQuery {
    slug: Option<String>,
    id: Option<Uuid>,
}

async fn article_shell(
    State(state): State<HttpState>,
    Query(query): Query<ArticleShellQuery>,
) -> Response {
    let requested_slug = query
        .slug
        .as_deref()
        .map(normalize)
        .unwrap_or_default();

    let id = match query.id {
        Some(id) => Some(id),
        None if !requested_slug.is_empty() => {
            locate_by_slug(&state, &requested_slug).await.map(|i| i.id)
        }
        None => None,
    };

    let article = match id {
        Some(id) => {
            let surface = state.surfaces.surface(SurfaceKey::ArticleById(id));
            let payload = surface
                .read_through(|| {
                    let content = Arc::clone(&state.content);
                    async move {
                        let detail = content.find_detail(id).await.map_err(|e| e.to_string())?;
                        let payload = detail
                            .filter(|d| d.item.status == ContentStatus::Published)
                            .map(|d| ArticlePayload {
                                id: d.item.id,
                                title: d.item.title,
                                body_html: d.item.body_html,
                                category_slug: d.category.slug,
                                category_name: d.category.name,
                                hero_image: d.item.hero_image,
                                published_at: d
                                    .item
                                    .published_at
                                    .and_then(|dt| {
                                        dt.format(
                                            &time::format_description::well_known::Rfc3339,
                                        )
                                        .ok()
                                    }),
                            });
                        serde_json::to_value(payload).map_err(|e| e.to_string())
                    }
                })
                .await;
            decode::<Option<ArticlePayload>>(payload, "article:id")
                .flatten()
                .map(ArticleView::from_payload)
        }
        None => None,
    };

    let view = ArticleShellView {
        site: state.site.clone(),
        requested_slug,
        article,
    };
    // Always 200: the shell's empty state is the graceful end of the
    // resolution chain, not an error.
    render_template_response(ArticleShellTemplate { view }, StatusCode::OK)
}

/// The shell's own live resolution: a direct slug hit first, then the same
/// bounded most-recent-first scan the resolver uses. Any failure is a miss
/// here; the shell renders its empty state instead of erroring.
async fn locate_by_slug(state: &HttpState, slug: &str) -> Option<ContentItemRecord> {
    match state.content.find_by_slug(slug).await {
        Ok(Some(item)) => return Some(item),
        Ok(None) => {}
        Err(err) => {
            warn!(
                target = "infra::http::article_shell",
                slug = slug,
                error = %err,
                "slug lookup failed in shell"
            );
            return None;
        }
    }

    match state.content.list_recent_published(SHELL_SCAN_LIMIT).await {
        Ok(items) => items.into_iter().find(|item| {
            item.canonical_slug()
                .map(|canonical| matches_normalized(slug, &canonical))
                .unwrap_or(false)
        }),
        Err(err) => {
            warn!(
                target = "infra::http::article_shell",
                slug = slug,
                error = %err,
                "candidate scan failed in shell"
            );
            None
        }
    }
}

async fn category_shell(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    let slug = normalize(&slug);
    let surface = state.surfaces.surface(SurfaceKey::Category(slug.clone()));

    let payload = surface
        .read_through(|| {
            let categories = Arc::clone(&state.categories);
            let content = Arc::clone(&state.content);
            let slug = slug.clone();
            async move {
                let (category, cards) = tokio::join!(
                    categories.find_by_slug(&slug),
                    content.list_cards_in_category(&slug, CATEGORY_LIMIT),
                );
                let payload = CategoryPayload {
                    name: category.map_err(|e| e.to_string())?.map(|c| c.name),
                    cards: cards.map_err(|e| e.to_string())?,
                };
                serde_json::to_value(payload).map_err(|e| e.to_string())
            }
        })
        .await;

    let payload = decode::<CategoryPayload>(payload, "category").unwrap_or(CategoryPayload {
        name: None,
        cards: Vec::new(),
    });

    let view = CategoryShellView {
        site: state.site.clone(),
        requested_slug: slug,
        category_name: payload.name,
        cards: payload.cards.iter().map(CardView::from_card).collect(),
    };
    render_template_response(CategoryShellTemplate { view }, StatusCode::OK)
}

fn decode<T: serde::de::DeserializeOwned>(payload: Option<Value>, surface: &str) -> Option<T> {
    let value = payload?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(
                target = "infra::http::public",
                surface = surface,
                error = %err,
                "snapshot payload failed to decode"
            );
            None
        }
    }
}

// ============================================================================
// Site index, robots, health
// ============================================================================

async fn sitemap(State(state): State<HttpState>) -> Response {
    match state.site_index.current_or_regenerate().await {
        Ok(xml) => {
            let mut response = (StatusCode::OK, xml).into_response();
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/xml; charset=utf-8"),
            );
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static(INDEX_CACHE_CONTROL));
            response
        }
        Err(err) => HttpError::from_error(
            "infra::http::sitemap",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Site index unavailable",
            &err,
        )
        .into_response(),
    }
}

async fn robots(State(state): State<HttpState>) -> Response {
    let body = state.site_index.robots_txt();
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

async fn healthz(State(state): State<HttpState>) -> Response {
    match state.content.ping().await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err) => {
            let mut response =
                (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
            ErrorReport::from_error(
                "infra::http::healthz",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
