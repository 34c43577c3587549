//! View structs and render helpers for the rendering shells.
//!
//! Shells are the fallback rendering surfaces: they resolve their content
//! live (through the snapshot cache) and always render something: a miss
//! becomes an empty state, never an error page.

use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::error::HttpError;
use crate::domain::entities::ContentCard;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        HttpError::from_error(
            err.source,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.public_message,
            &err.error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error: err,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Clone)]
pub struct SiteChrome {
    pub title: String,
    pub base_url: String,
}

#[derive(Clone)]
pub struct CardView {
    pub title: String,
    pub href: String,
    pub description: String,
    pub image: Option<String>,
}

impl CardView {
    pub fn from_card(card: &ContentCard) -> Self {
        Self {
            title: card.title.clone(),
            href: format!("/{}/{}/", card.category_slug, card.slug),
            description: card.description.clone(),
            image: card.hero_image.clone(),
        }
    }
}

/// The article payload shells cache per item identity. This is the wire
/// shape stored in snapshot entries, so it stays serde-stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePayload {
    pub id: uuid::Uuid,
    pub title: String,
    pub body_html: String,
    pub category_slug: String,
    pub category_name: String,
    pub hero_image: Option<String>,
    pub published_at: Option<String>,
}

/// The category payload shells cache per category slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub cards: Vec<ContentCard>,
}

#[derive(Clone)]
pub struct ArticleView {
    pub title: String,
    pub body_html: String,
    pub category_name: String,
    pub category_href: String,
    pub published_at: Option<String>,
}

impl ArticleView {
    pub fn from_payload(payload: ArticlePayload) -> Self {
        Self {
            title: payload.title,
            body_html: payload.body_html,
            category_name: payload.category_name,
            category_href: format!("/category/{}", payload.category_slug),
            published_at: payload.published_at,
        }
    }
}

pub struct HomeView {
    pub site: SiteChrome,
    pub hero: Option<CardView>,
    pub recent: Vec<CardView>,
    pub sidebar: Vec<CardView>,
}

pub struct ArticleShellView {
    pub site: SiteChrome,
    pub requested_slug: String,
    pub article: Option<ArticleView>,
}

pub struct CategoryShellView {
    pub site: SiteChrome,
    pub requested_slug: String,
    pub category_name: Option<String>,
    pub cards: Vec<CardView>,
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: HomeView,
}

#[derive(Template)]
#[template(path = "article_shell.html")]
pub struct ArticleShellTemplate {
    pub view: ArticleShellView,
}

#[derive(Template)]
#[template(path = "category_shell.html")]
pub struct CategoryShellTemplate {
    pub view: CategoryShellView,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub site: SiteChrome,
}

pub fn render_not_found_response(site: SiteChrome) -> Response {
    render_template_response(NotFoundTemplate { site }, StatusCode::NOT_FOUND)
}
