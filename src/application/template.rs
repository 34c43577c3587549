//! Typed article document construction.
//!
//! A rendered artifact is produced by substituting named slots into a fixed
//! HTML template via literal string replacement. Construction rejects
//! missing required fields instead of silently emitting blank sections.
//! The canonical tag can additionally be rewritten at serve time, so a
//! document served under a variant path still advertises one canonical URL.

use std::fmt::Write as _;

use std::cell::Cell;

use lol_html::{RewriteStrSettings, element, rewrite_str};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::entities::ContentCard;

/// The fixed document template. Slots are substituted literally; the
/// canonical slot is also recognized at serve time for rewriting.
const DOCUMENT_TEMPLATE: &str = include_str!("../../templates/document.html");

pub const CANONICAL_PLACEHOLDER: &str = "{{canonical_url}}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("required document slot `{slot}` is missing or empty")]
    MissingSlot { slot: &'static str },
    #[error("document rewrite failed: {message}")]
    Rewrite { message: String },
}

/// A fully validated set of document slots, ready to render.
#[derive(Debug, Clone)]
pub struct ArticleDocument {
    title: String,
    description: String,
    canonical_url: String,
    category_slug: String,
    category_name: String,
    published_at: Option<OffsetDateTime>,
    hero_image: Option<String>,
    body_html: String,
    tags: Vec<String>,
    related: Vec<ContentCard>,
    sidebar: Vec<ContentCard>,
}

#[derive(Debug, Default, Clone)]
pub struct ArticleDocumentBuilder {
    title: Option<String>,
    description: Option<String>,
    canonical_url: Option<String>,
    category_slug: Option<String>,
    category_name: Option<String>,
    published_at: Option<OffsetDateTime>,
    hero_image: Option<String>,
    body_html: Option<String>,
    tags: Vec<String>,
    related: Vec<ContentCard>,
    sidebar: Vec<ContentCard>,
}

impl ArticleDocumentBuilder {
    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    pub fn canonical_url(mut self, value: impl Into<String>) -> Self {
        self.canonical_url = Some(value.into());
        self
    }

    pub fn category(mut self, slug: impl Into<String>, name: impl Into<String>) -> Self {
        self.category_slug = Some(slug.into());
        self.category_name = Some(name.into());
        self
    }

    pub fn published_at(mut self, value: Option<OffsetDateTime>) -> Self {
        self.published_at = value;
        self
    }

    pub fn hero_image(mut self, value: Option<String>) -> Self {
        self.hero_image = value;
        self
    }

    pub fn body_html(mut self, value: impl Into<String>) -> Self {
        self.body_html = Some(value.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn related(mut self, cards: Vec<ContentCard>) -> Self {
        self.related = cards;
        self
    }

    pub fn sidebar(mut self, cards: Vec<ContentCard>) -> Self {
        self.sidebar = cards;
        self
    }

    pub fn build(self) -> Result<ArticleDocument, TemplateError> {
        Ok(ArticleDocument {
            title: required(self.title, "title")?,
            description: required(self.description, "description")?,
            canonical_url: required(self.canonical_url, "canonical_url")?,
            category_slug: required(self.category_slug, "category_slug")?,
            category_name: required(self.category_name, "category_name")?,
            published_at: self.published_at,
            hero_image: self.hero_image,
            body_html: required(self.body_html, "body")?,
            tags: self.tags,
            related: self.related,
            sidebar: self.sidebar,
        })
    }
}

fn required(value: Option<String>, slot: &'static str) -> Result<String, TemplateError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(TemplateError::MissingSlot { slot }),
    }
}

impl ArticleDocument {
    pub fn builder() -> ArticleDocumentBuilder {
        ArticleDocumentBuilder::default()
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Substitute every slot into the fixed template.
    ///
    /// Re-rendering with unchanged input reproduces an equivalent document:
    /// nothing here reads clocks or counters.
    pub fn render(&self) -> String {
        let published = self
            .published_at
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_default();
        let hero = self.hero_image.as_deref().unwrap_or_default();

        DOCUMENT_TEMPLATE
            .replace("{{title}}", &escape_html(&self.title))
            .replace("{{description}}", &escape_html(&self.description))
            .replace(CANONICAL_PLACEHOLDER, &self.canonical_url)
            .replace("{{category_slug}}", &self.category_slug)
            .replace("{{category_name}}", &escape_html(&self.category_name))
            .replace("{{published_at}}", &published)
            .replace("{{hero_image}}", hero)
            .replace("{{body}}", &self.body_html)
            .replace("{{tag_list}}", &render_tag_list(&self.tags))
            .replace("{{related_posts}}", &render_card_fragment(&self.related))
            .replace("{{sidebar_posts}}", &render_card_fragment(&self.sidebar))
    }
}

fn render_tag_list(tags: &[String]) -> String {
    let mut out = String::new();
    for tag in tags {
        let _ = write!(out, "<li class=\"tag\">{}</li>", escape_html(tag));
    }
    out
}

/// Cards render to a flat list-item fragment; an empty slice renders an
/// empty fragment, which is also the degraded state when the auxiliary
/// query behind the cards failed.
fn render_card_fragment(cards: &[ContentCard]) -> String {
    let mut out = String::new();
    for card in cards {
        let _ = write!(
            out,
            "<li><a href=\"/{}/{}/\">{}</a></li>",
            card.category_slug,
            card.slug,
            escape_html(&card.title)
        );
    }
    out
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Rewrite the canonical link and `og:url` meta of an already-rendered
/// document. Returns the rewritten document and whether any tag was
/// actually touched; when none was, the caller injects a `Link` header
/// instead.
pub fn rewrite_canonical(html: &str, canonical: &str) -> Result<(String, bool), TemplateError> {
    if html.contains(CANONICAL_PLACEHOLDER) {
        return Ok((html.replace(CANONICAL_PLACEHOLDER, canonical), true));
    }

    let touched = Cell::new(false);
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("link[rel=\"canonical\"]", |el| {
                    el.set_attribute("href", canonical)?;
                    touched.set(true);
                    Ok(())
                }),
                element!("meta[property=\"og:url\"]", |el| {
                    el.set_attribute("content", canonical)?;
                    touched.set(true);
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| TemplateError::Rewrite {
        message: err.to_string(),
    })?;
    Ok((rewritten, touched.get()))
}
