//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueHint};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_ARTIFACT_ROOT: &str = "artifacts";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CANDIDATE_BATCH_LIMIT: u32 = 50;
const DEFAULT_REDIRECT_MAX_AGE_SECS: u64 = 60;

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio publication server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Folio HTTP service.
    Serve(ServeArgs),
    /// Regenerate the site index out of band. Also the manual retry path
    /// after a partial synchronization.
    #[command(name = "reindex")]
    Reindex(ReindexArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the artifact storage directory.
    #[arg(long = "artifacts-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub artifacts_root: Option<PathBuf>,

    /// Override the public site URL used for canonical links.
    #[arg(long = "site-public-url", value_name = "URL")]
    pub site_public_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ReindexArgs {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the artifact storage directory.
    #[arg(long = "artifacts-root", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub artifacts_root: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub graceful_shutdown: Duration,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub public_url: String,
    pub title: String,
    pub description: String,
    /// Static utility pages advertised in the site index and excluded from
    /// article-shell rewrites.
    pub utility_pages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub candidate_batch_limit: u32,
    pub redirect_max_age: Duration,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub hero_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub article_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = crate::cache::CacheConfig::default();
        Self {
            enabled: defaults.enabled,
            hero_ttl_secs: defaults.hero_ttl_secs,
            list_ttl_secs: defaults.list_ttl_secs,
            article_ttl_secs: defaults.article_ttl_secs,
        }
    }
}

impl From<&CacheSettings> for crate::cache::CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            hero_ttl_secs: settings.hero_ttl_secs,
            list_ttl_secs: settings.list_ttl_secs,
            article_ttl_secs: settings.article_ttl_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub site: SiteSettings,
    pub database: DatabaseSettings,
    pub artifacts: ArtifactSettings,
    pub resolver: ResolverSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

// ============================================================================
// Raw (deserialized) shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    server: RawServer,
    site: RawSite,
    database: RawDatabase,
    artifacts: RawArtifacts,
    resolver: RawResolver,
    cache: CacheSettings,
    logging: RawLogging,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawServer {
    host: String,
    port: u16,
    graceful_shutdown_secs: u64,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            graceful_shutdown_secs: DEFAULT_GRACEFUL_SHUTDOWN_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSite {
    public_url: String,
    title: String,
    description: String,
    utility_pages: Vec<String>,
}

impl Default for RawSite {
    fn default() -> Self {
        Self {
            public_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            title: "Folio".to_string(),
            description: String::new(),
            utility_pages: vec!["about".to_string(), "contact".to_string()],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDatabase {
    url: String,
    max_connections: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawArtifacts {
    root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawResolver {
    candidate_batch_limit: Option<u32>,
    redirect_max_age_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: String,
    format: LogFormat,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parse CLI arguments and load settings with layered precedence.
pub fn load_with_cli() -> Result<(CliArgs, Settings), ConfigError> {
    let cli = CliArgs::parse();
    let settings = load(&cli)?;
    Ok((cli, settings))
}

pub fn load(cli: &CliArgs) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = &cli.config_file {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    let raw: RawSettings = builder
        .add_source(Environment::with_prefix("FOLIO").separator("__"))
        .build()?
        .try_deserialize()?;

    let mut settings = validate(raw)?;
    apply_cli_overrides(&mut settings, cli);
    Ok(settings)
}

fn validate(raw: RawSettings) -> Result<Settings, ConfigError> {
    let level = LevelFilter::from_str(&raw.logging.level).map_err(|_| {
        ConfigError::invalid(format!("unknown log level `{}`", raw.logging.level))
    })?;

    Url::parse(&raw.site.public_url).map_err(|err| {
        ConfigError::invalid(format!(
            "site.public_url `{}` is not a valid URL: {err}",
            raw.site.public_url
        ))
    })?;

    if raw.resolver.candidate_batch_limit == Some(0) {
        return Err(ConfigError::invalid(
            "resolver.candidate_batch_limit must be at least 1",
        ));
    }

    Ok(Settings {
        server: ServerSettings {
            host: raw.server.host,
            port: raw.server.port,
            graceful_shutdown: Duration::from_secs(raw.server.graceful_shutdown_secs),
        },
        site: SiteSettings {
            public_url: raw.site.public_url,
            title: raw.site.title,
            description: raw.site.description,
            utility_pages: raw.site.utility_pages,
        },
        database: DatabaseSettings {
            url: raw.database.url,
            max_connections: raw
                .database
                .max_connections
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        },
        artifacts: ArtifactSettings {
            root: raw
                .artifacts
                .root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_ROOT)),
        },
        resolver: ResolverSettings {
            candidate_batch_limit: raw
                .resolver
                .candidate_batch_limit
                .unwrap_or(DEFAULT_CANDIDATE_BATCH_LIMIT),
            redirect_max_age: Duration::from_secs(
                raw.resolver
                    .redirect_max_age_secs
                    .unwrap_or(DEFAULT_REDIRECT_MAX_AGE_SECS),
            ),
        },
        cache: raw.cache,
        logging: LoggingSettings {
            level,
            format: raw.logging.format,
        },
    })
}

fn apply_cli_overrides(settings: &mut Settings, cli: &CliArgs) {
    match &cli.command {
        Some(Command::Serve(args)) => {
            if let Some(host) = &args.server_host {
                settings.server.host = host.clone();
            }
            if let Some(port) = args.server_port {
                settings.server.port = port;
            }
            if let Some(url) = &args.database_url {
                settings.database.url = url.clone();
            }
            if let Some(root) = &args.artifacts_root {
                settings.artifacts.root = root.clone();
            }
            if let Some(url) = &args.site_public_url {
                settings.site.public_url = url.clone();
            }
        }
        Some(Command::Reindex(args)) => {
            if let Some(url) = &args.database_url {
                settings.database.url = url.clone();
            }
            if let Some(root) = &args.artifacts_root {
                settings.artifacts.root = root.clone();
            }
        }
        None => {}
    }
}

/// Fail early when the database URL is absent; every command needs it.
pub fn require_database_url(settings: &Settings) -> Result<(), ConfigError> {
    if settings.database.url.trim().is_empty() {
        return Err(ConfigError::invalid(
            "database.url must be set (FOLIO_DATABASE__URL or --database-url)",
        ));
    }
    Ok(())
}
