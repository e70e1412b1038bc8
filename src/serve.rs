use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use anyhow::Context as _;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use clap::Parser;
use clap_verbosity_flag::{log::LevelFilter, InfoLevel, Verbosity};
use figment::{providers::Format as _, Figment};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeader, trace::TraceLayer,
};
use tracing::{info, warn};

use super::{
    account_manager::AccountManager,
    complaints::ComplaintManager,
    config::AppConfig,
    db::{establish_pool, Db},
    forum::Forum,
    units::Units,
    uploads::Uploads,
};
pub use super::error::Error;

/// The application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Room for the text fields of a filing form on top of the photo itself.
const FORM_OVERHEAD: u64 = 64 * 1024;

#[derive(Parser, Debug, Clone)]
/// Command line arguments.
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "default.toml")]
    pub config: PathBuf,
    /// The verbosity level.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Clone, FromRef)]
/// The application state, shared across all routes.
pub struct AppState {
    /// The application configuration.
    pub(crate) config: AppConfig,
    /// The main database connection pool.
    pub db: Db,
    pub accounts: AccountManager,
    pub units: Units,
    pub complaints: ComplaintManager,
    pub forum: Forum,
    pub uploads: Uploads,
}

impl AppState {
    pub fn new(config: AppConfig, db: Db) -> Self {
        Self {
            accounts: AccountManager::new(db.clone(), &config.sessions),
            units: Units::new(db.clone()),
            complaints: ComplaintManager::new(db.clone()),
            forum: Forum::new(db.clone()),
            uploads: Uploads::new(&config.uploads),
            config,
            db,
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.uploads.limit() + FORM_OVERHEAD).unwrap_or(usize::MAX);
    // Browsers must not sniff stored photos into anything executable.
    let photos = SetResponseHeader::overriding(
        ServeDir::new(state.uploads.dir()),
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Router::new()
        .route("/", get(super::index))
        .merge(super::endpoints::routes())
        .nest_service("/uploads", photos)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the database and upload directory, seed units and provision the
/// super-admin. Returns the state to serve.
pub async fn prepare(config: AppConfig) -> anyhow::Result<AppState> {
    tokio::fs::create_dir_all(&config.uploads.path)
        .await
        .context("failed to create upload directory")?;

    let db = establish_pool(&config.db)
        .await
        .context("failed to establish database connection pool")?;
    let state = AppState::new(config, db);

    state
        .units
        .seed(&state.config.units)
        .await
        .context("failed to seed units")?;

    match &state.config.bootstrap {
        Some(bootstrap) => {
            let generated = state
                .accounts
                .ensure_super_admin(bootstrap)
                .await
                .context("failed to provision super admin")?;

            if let Some(password) = generated {
                // N.B: This is a sensitive message, so we're bypassing `tracing` here and
                // logging it directly to console.
                println!("=====================================");
                println!("            FIRST STARTUP            ");
                println!("=====================================");
                println!("Super admin: {}", bootstrap.super_admin_email);
                println!("Password:    {password}");
                println!("=====================================");
            }
        }
        None => warn!("no [bootstrap] section configured; no super admin will be created"),
    }

    Ok(state)
}

/// The main application entry point.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up trace logging to console and account for the user-provided verbosity flag.
    if args.verbosity.log_level_filter() != LevelFilter::Off {
        let lvl = match args.verbosity.log_level_filter() {
            LevelFilter::Error => tracing::Level::ERROR,
            LevelFilter::Warn => tracing::Level::WARN,
            LevelFilter::Info | LevelFilter::Off => tracing::Level::INFO,
            LevelFilter::Debug => tracing::Level::DEBUG,
            LevelFilter::Trace => tracing::Level::TRACE,
        };
        tracing_subscriber::fmt().with_max_level(lvl).init();
    }

    if !args.config.exists() {
        // Not fatal: every setting may also come from the environment.
        warn!(
            "configuration file {} does not exist",
            args.config.display()
        );
    }

    // Read and parse the user-provided configuration.
    let config: AppConfig = Figment::new()
        .admerge(figment::providers::Toml::file(args.config))
        .admerge(figment::providers::Env::prefixed("BRGY_"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize metrics reporting.
    super::metrics::setup(config.metrics.as_ref()).context("failed to set up metrics exporter")?;

    let addr = config
        .listen_address
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));

    let state = prepare(config).await?;
    let app = router(state);

    info!("listening on {addr}");
    info!("connect to: http://127.0.0.1:{}", addr.port());

    let listener = TcpListener::bind(&addr)
        .await
        .context("failed to bind address")?;

    axum::serve(listener, app.into_make_service())
        .await
        .context("failed to serve app")
}
