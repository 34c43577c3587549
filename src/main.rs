use std::{future::IntoFuture, process, sync::Arc};

use folio::{
    application::{
        artifacts::ArtifactStore,
        error::AppError,
        publication::PublicationSync,
        repos::{CategoriesRepo, ContentRepo},
        resolver::{ResolverConfig, SlugResolver},
        site_index::SiteIndexService,
    },
    cache::{CacheConfig, Surfaces},
    config,
    infra::{
        artifacts::FsArtifactStore,
        db::PostgresContentStore,
        http::{HttpState, NavigationPolicy, build_router},
        telemetry,
    },
    presentation::views::SiteChrome,
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;
    config::require_database_url(&settings)
        .map_err(|err| AppError::validation(err.to_string()))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    match command {
        config::Command::Serve(_) => serve(settings).await,
        config::Command::Reindex(_) => reindex(settings).await,
    }
}

struct Services {
    content: Arc<dyn ContentRepo>,
    categories: Arc<dyn CategoriesRepo>,
    artifacts: Arc<dyn ArtifactStore>,
    site_index: SiteIndexService,
}

async fn build_services(settings: &config::Settings) -> Result<Services, AppError> {
    let store = Arc::new(
        PostgresContentStore::connect(
            &settings.database.url,
            settings.database.max_connections,
        )
        .await
        .map_err(|err| AppError::unexpected(format!("database connection failed: {err}")))?,
    );
    let content: Arc<dyn ContentRepo> = store.clone();
    let categories: Arc<dyn CategoriesRepo> = store;

    let artifacts: Arc<dyn ArtifactStore> = Arc::new(
        FsArtifactStore::new(settings.artifacts.root.clone())
            .map_err(folio::infra::error::InfraError::from)?,
    );

    let site_index = SiteIndexService::new(
        Arc::clone(&content),
        Arc::clone(&categories),
        Arc::clone(&artifacts),
        settings.site.public_url.clone(),
        settings.site.utility_pages.clone(),
    );

    Ok(Services {
        content,
        categories,
        artifacts,
        site_index,
    })
}

async fn serve(settings: config::Settings) -> Result<(), AppError> {
    let services = build_services(&settings).await?;

    let resolver = Arc::new(SlugResolver::new(
        Arc::clone(&services.content),
        Arc::clone(&services.artifacts),
        ResolverConfig {
            candidate_batch_limit: settings.resolver.candidate_batch_limit,
            redirect_max_age: settings.resolver.redirect_max_age,
        },
    ));
    let publication = PublicationSync::new(
        Arc::clone(&services.content),
        Arc::clone(&services.artifacts),
        services.site_index.clone(),
        settings.site.public_url.clone(),
    );
    let surfaces = Surfaces::new(CacheConfig::from(&settings.cache));
    let policy = Arc::new(NavigationPolicy::new(
        settings.site.utility_pages.iter().cloned(),
    ));

    let state = HttpState {
        content: services.content,
        categories: services.categories,
        resolver,
        publication,
        site_index: services.site_index,
        surfaces,
        policy,
        site: SiteChrome {
            title: settings.site.title.clone(),
            base_url: settings.site.public_url.clone(),
        },
    };
    let router = build_router(state);

    let bind_address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(folio::infra::error::InfraError::from)?;
    info!(
        target = "folio::main",
        address = bind_address,
        "public listener started"
    );

    // Drain in-flight connections after the shutdown signal, but only for
    // the configured grace window.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut drain_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown({
            let mut rx = shutdown_rx;
            async move {
                let _ = rx.changed().await;
            }
        })
        .into_future();
    tokio::pin!(server);

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = &mut server => {
            result.map_err(folio::infra::error::InfraError::from)?;
        }
        () = async {
            let _ = drain_rx.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "folio::main",
                grace_secs = grace.as_secs(),
                "graceful shutdown window elapsed with connections still open"
            );
        }
    }

    info!(target = "folio::main", "shutdown complete");
    Ok(())
}

async fn reindex(settings: config::Settings) -> Result<(), AppError> {
    let services = build_services(&settings).await?;
    let xml = services
        .site_index
        .regenerate()
        .await
        .map_err(|err| AppError::unexpected(format!("site index regeneration failed: {err}")))?;
    info!(
        target = "folio::main",
        bytes = xml.len(),
        "site index regenerated"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(target = "folio::main", "shutdown signal received");
}
