use anyhow::Result;
use axum::Router;
use report_drop::AppState;
use report_drop::config::{AppConfig, IndexMode, StoreBackend};
use report_drop::services::catalog::ReportCatalog;
use report_drop::services::cloud_store::{CloudStore, CloudStoreConfig};
use report_drop::services::listing_catalog::ListingCatalog;
use report_drop::services::memory_store::MemoryStore;
use report_drop::services::names_service::NamesStore;
use report_drop::services::object_store::ObjectStore;
use report_drop::services::report_service::ReportService;
use report_drop::services::sqlite_catalog::{self, SqliteCatalog};
use report_drop::slots::SlotRegistry;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting report-drop on {} (index: {:?}, store: {:?})",
        cfg.addr(),
        cfg.index_mode,
        cfg.store_backend
    );

    // --- Handle migration mode ---
    if migrate {
        let db = connect_sqlite(&cfg.database_url).await?;
        sqlite_catalog::apply_schema(&db).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Slot registry ---
    let registry = SlotRegistry::new(&cfg.slot_one, &cfg.slot_two)?;

    // --- Object store ---
    let store: Arc<dyn ObjectStore> = match cfg.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(cfg.store_folder.clone())),
        StoreBackend::Cloud => {
            let (Some(base_url), Some(api_key), Some(api_secret)) = (
                cfg.store_url.clone(),
                cfg.store_key.clone(),
                cfg.store_secret.clone(),
            ) else {
                anyhow::bail!("cloud store backend requires URL and credentials");
            };
            Arc::new(CloudStore::new(CloudStoreConfig {
                base_url,
                api_key,
                api_secret,
                folder: cfg.store_folder.clone(),
            })?)
        }
    };

    // --- Catalog ---
    let catalog: Arc<dyn ReportCatalog> = match cfg.index_mode {
        IndexMode::Listing => Arc::new(ListingCatalog::new(store.clone(), registry.clone())),
        IndexMode::Sqlite => {
            let db = connect_sqlite(&cfg.database_url).await?;
            // Idempotent, so applying at every boot is safe.
            sqlite_catalog::apply_schema(&db).await?;
            Arc::new(SqliteCatalog::new(store.clone(), db, registry.clone()))
        }
    };

    // --- Ensure the names file's directory exists ---
    if let Some(parent) = Path::new(&cfg.names_file).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
        tracing::info!("Created names directory at {}", parent.display());
    }

    // --- Assemble state + router ---
    let service = Arc::new(ReportService::new(registry.clone(), catalog, store));
    let names = Arc::new(NamesStore::new(&cfg.names_file, registry));
    let state = AppState {
        service,
        names,
        admin_password: cfg.admin_password.clone(),
    };
    let app: Router = report_drop::routes::routes::routes(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the catalog database, creating the backing file's directory first.
async fn connect_sqlite(db_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Extract the local file path SQLx will use
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    let db_path_obj = Path::new(db_path);
    if let Some(parent) = db_path_obj.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
        tracing::info!("Created missing directory {:?}", parent);
    }

    // Try opening manually before SQLx
    match fs::OpenOptions::new().create(true).write(true).open(db_path) {
        Ok(_) => tracing::debug!("File can be created/opened successfully."),
        Err(e) => tracing::warn!("Failed to open file manually: {}", e),
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;
    Ok(pool)
}
