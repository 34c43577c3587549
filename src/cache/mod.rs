//! The snapshot cache layer.
//!
//! Every content surface (hero, lists, article body) paints from a local
//! snapshot before its live fetch resolves. Each surface owns an
//! independent key in a shared storage substrate; a failure or slow
//! refresh on one surface never blocks or corrupts another's entry.
//!
//! The contract is read-through: `read` is synchronous and returns the
//! most recent write regardless of age, `refresh` always issues the live
//! fetch and only overwrites on success. TTL only decides whether a
//! refresh can be skipped. It never blocks the optimistic read.

mod config;
mod corruption;
mod entry;
mod keys;
mod registry;
mod store;
mod surface;

pub use config::CacheConfig;
pub use corruption::{CorruptionPolicy, CorruptionReason};
pub use entry::{Freshness, SnapshotEntry};
pub use keys::SurfaceKey;
pub use registry::Surfaces;
pub use store::SnapshotStore;
pub use surface::{Snapshot, Surface};
