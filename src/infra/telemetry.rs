use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_snapshot_hit_total",
            Unit::Count,
            "Total number of fresh snapshot reads."
        );
        describe_counter!(
            "folio_snapshot_stale_total",
            Unit::Count,
            "Total number of snapshot reads served past their TTL."
        );
        describe_counter!(
            "folio_snapshot_miss_total",
            Unit::Count,
            "Total number of snapshot reads with no entry."
        );
        describe_counter!(
            "folio_snapshot_purge_total",
            Unit::Count,
            "Total number of snapshots purged by corruption detection."
        );
        describe_counter!(
            "folio_snapshot_refresh_failure_total",
            Unit::Count,
            "Total number of failed surface refreshes."
        );
        describe_counter!(
            "folio_resolver_exact_hit_total",
            Unit::Count,
            "Slug resolutions served from an exact artifact match."
        );
        describe_counter!(
            "folio_resolver_variant_hit_total",
            Unit::Count,
            "Slug resolutions served from a normalization variant."
        );
        describe_counter!(
            "folio_resolver_memo_hit_total",
            Unit::Count,
            "Slug resolutions served from the variation memo."
        );
        describe_counter!(
            "folio_resolver_record_hit_total",
            Unit::Count,
            "Slug resolutions redirected after a content-store match."
        );
        describe_counter!(
            "folio_resolver_shell_fallback_total",
            Unit::Count,
            "Slug resolutions redirected to the shell without a match."
        );
        describe_counter!(
            "folio_sync_success_total",
            Unit::Count,
            "Publication synchronizations that reached their end state."
        );
        describe_counter!(
            "folio_sync_partial_total",
            Unit::Count,
            "Synchronizations where the artifact succeeded but the index did not."
        );
        describe_counter!(
            "folio_sync_failure_total",
            Unit::Count,
            "Publication synchronizations that failed outright."
        );
    });
}
