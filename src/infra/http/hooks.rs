//! Publication hooks.
//!
//! The authoring collaborator owns content writes and calls this endpoint
//! after each state change; it is the pipeline's entry point. Re-delivery
//! of the same event is safe: synchronization is idempotent end to end.

use axum::{Json, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::{
    error::{ErrorReport, HttpError},
    publication::{PublicationEvent, SyncError, SyncOutcome},
};

use super::public::HttpState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    Published,
    Updated,
    Unpublished,
    Deleted,
}

#[derive(Debug, Deserialize)]
pub struct PublicationHookPayload {
    pub action: HookAction,
    pub id: Uuid,
    /// Slug hint for deletes, where the record is already gone.
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Serialize)]
struct HookResponse {
    outcome: &'static str,
    slug: Option<String>,
}

pub async fn publication_hook(
    State(state): State<HttpState>,
    Json(payload): Json<PublicationHookPayload>,
) -> Response {
    let event = match payload.action {
        HookAction::Published => PublicationEvent::Published { id: payload.id },
        HookAction::Updated => PublicationEvent::Updated { id: payload.id },
        HookAction::Unpublished => PublicationEvent::Unpublished { id: payload.id },
        HookAction::Deleted => PublicationEvent::Deleted {
            id: payload.id,
            slug: payload.slug,
        },
    };

    match state.publication.apply(&event).await {
        Ok(SyncOutcome::Synced { slug }) => Json(HookResponse {
            outcome: "synced",
            slug: Some(slug),
        })
        .into_response(),
        Ok(SyncOutcome::Removed { slug }) => Json(HookResponse {
            outcome: "removed",
            slug: Some(slug),
        })
        .into_response(),
        Ok(SyncOutcome::Skipped) => Json(HookResponse {
            outcome: "skipped",
            slug: None,
        })
        .into_response(),
        // The artifact reached its end state; only the index lagged. Not
        // fatal to the publish action; the caller retries the index alone
        // (or the next event catches it up).
        Err(err @ SyncError::PartialSync { .. }) => {
            let slug = match &err {
                SyncError::PartialSync { slug, .. } => slug.clone(),
                _ => String::new(),
            };
            let mut response = (
                StatusCode::ACCEPTED,
                Json(HookResponse {
                    outcome: "partial_sync",
                    slug: Some(slug),
                }),
            )
                .into_response();
            ErrorReport::from_error(
                "infra::http::publication_hook",
                StatusCode::ACCEPTED,
                &err,
            )
            .attach(&mut response);
            response
        }
        Err(err) => HttpError::from_error(
            "infra::http::publication_hook",
            StatusCode::BAD_GATEWAY,
            "Publication synchronization failed",
            &err,
        )
        .into_response(),
    }
}
