//! Folio: a publication server.
//!
//! Keeps pre-rendered article documents and a site index in sync with a
//! mutable content store, resolves human-readable slugs through a tiered
//! fallback that never hard-fails a plausible content path, and paints
//! rendering shells from a snapshot cache before reconciling with the
//! store.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
mod util;
