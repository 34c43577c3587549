//! Cache-coherence tests for the rendering shells: optimistic paint from
//! snapshots, reconciliation with the store, and corruption eviction.

mod support;

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, header};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use folio::application::publication::PublicationEvent;
use support::{TestContext, category, published_item};

fn navigate(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .expect("request")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

async fn seed_published(ctx: &TestContext, title: &str) -> uuid::Uuid {
    let guides = category("guides", "Guides");
    let item = published_item(title, &guides);
    ctx.content.insert_category(guides);
    ctx.content.insert_item(item.clone());
    ctx.publication
        .apply(&PublicationEvent::Published { id: item.id })
        .await
        .expect("publish");
    item.id
}

#[tokio::test]
async fn cold_visit_paints_live_and_persists_snapshots() {
    let ctx = TestContext::new();
    seed_published(&ctx, "First Visit Story").await;

    assert!(ctx.surfaces.store().is_empty());

    let response = ctx.router().oneshot(navigate("/")).await.expect("home");
    let body = body_text(response).await;
    assert!(body.contains("First Visit Story"));

    // Hero, recent and sidebar each persisted their own entry.
    assert_eq!(ctx.surfaces.store().len(), 3);
    assert!(ctx.surfaces.store().read("home:hero").is_some());
    assert!(ctx.surfaces.store().read("home:recent").is_some());
    assert!(ctx.surfaces.store().read("sidebar:latest").is_some());
}

#[tokio::test]
async fn warm_cache_paints_even_when_the_store_is_down() {
    let ctx = TestContext::new();
    seed_published(&ctx, "Resilient Story").await;

    let warmup = ctx.router().oneshot(navigate("/")).await.expect("warmup");
    assert!(body_text(warmup).await.contains("Resilient Story"));

    ctx.content.fail_all.store(true, Ordering::SeqCst);

    let offline = ctx.router().oneshot(navigate("/")).await.expect("reload");
    let body = body_text(offline).await;
    assert!(
        body.contains("Resilient Story"),
        "warm snapshot must survive a store outage"
    );
}

#[tokio::test]
async fn corrupted_hero_snapshot_is_purged_not_rendered() {
    let ctx = TestContext::new();
    ctx.surfaces.store().write(
        "home:hero",
        json!({
            "id": uuid::Uuid::nil(),
            "title": "Half Saved",
            "slug": "half-saved",
            "description": "",
            "hero_image": "https://cdn.example.com/assets/img/placeholder.png",
            "category_slug": "guides",
            "published_at": null,
        }),
    );
    // No live fallback either, so a rendered placeholder could only have
    // come from the corrupted snapshot.
    ctx.content.fail_all.store(true, Ordering::SeqCst);

    let response = ctx.router().oneshot(navigate("/")).await.expect("home");
    let body = body_text(response).await;

    assert!(!body.contains("Half Saved"));
    assert!(body.contains("hero-loading"));
    assert!(
        ctx.surfaces.store().read("home:hero").is_none(),
        "corrupted entry must be purged outright"
    );
}

#[tokio::test]
async fn article_shell_paints_from_its_identity_snapshot() {
    let ctx = TestContext::new();
    let id = seed_published(&ctx, "Cached Article").await;

    let uri = format!("/article?slug=cached-article&id={id}");
    let first = ctx.router().oneshot(navigate(&uri)).await.expect("first");
    assert!(body_text(first).await.contains("Cached Article"));

    ctx.content.fail_all.store(true, Ordering::SeqCst);

    let second = ctx.router().oneshot(navigate(&uri)).await.expect("second");
    assert!(
        body_text(second).await.contains("Cached Article"),
        "article snapshot must carry the shell through an outage"
    );
}

#[tokio::test]
async fn category_surfaces_fail_independently() {
    let ctx = TestContext::new();
    let guides = category("guides", "Guides");
    let news = category("news", "News");
    let item = published_item("Guides Only", &guides);
    ctx.content.insert_category(guides);
    ctx.content.insert_category(news.clone());
    ctx.content.insert_item(item.clone());
    ctx.publication
        .apply(&PublicationEvent::Published { id: item.id })
        .await
        .expect("publish");

    let warm = ctx
        .router()
        .oneshot(navigate("/category/guides"))
        .await
        .expect("warm guides");
    assert!(body_text(warm).await.contains("Guides Only"));

    ctx.content.fail_all.store(true, Ordering::SeqCst);

    // The warmed surface still paints.
    let guides_offline = ctx
        .router()
        .oneshot(navigate("/category/guides"))
        .await
        .expect("guides offline");
    assert!(body_text(guides_offline).await.contains("Guides Only"));

    // The cold surface degrades to its own empty state without touching
    // the warmed one.
    let news_offline = ctx
        .router()
        .oneshot(navigate("/category/news"))
        .await
        .expect("news offline");
    let body = body_text(news_offline).await;
    assert!(body.contains("No published items here yet."));
    assert!(
        ctx.surfaces.store().read("category:guides").is_some(),
        "sibling surface entry must be untouched"
    );
}
