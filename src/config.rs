use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;
use std::str::FromStr;

/// Which catalog strategy indexes uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Stateless: derive everything from store listings.
    Listing,
    /// Stateful: one SQLite row per slot, fixed store keys.
    Sqlite,
}

impl FromStr for IndexMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "listing" => Ok(IndexMode::Listing),
            "sqlite" => Ok(IndexMode::Sqlite),
            other => Err(format!(
                "unknown index mode `{other}` (expected `listing` or `sqlite`)"
            )),
        }
    }
}

/// Which object-store implementation holds the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store for local development.
    Memory,
    /// Hosted HTTP store.
    Cloud,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "cloud" => Ok(StoreBackend::Cloud),
            other => Err(format!(
                "unknown store backend `{other}` (expected `memory` or `cloud`)"
            )),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub admin_password: String,
    pub slot_one: String,
    pub slot_two: String,
    pub index_mode: IndexMode,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub names_file: String,
    pub store_folder: String,
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub store_secret: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Report upload/download backend")]
pub struct Args {
    /// Host to bind to (overrides REPORT_DROP_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides REPORT_DROP_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Catalog strategy, `listing` or `sqlite` (overrides REPORT_DROP_INDEX_MODE)
    #[arg(long)]
    pub index_mode: Option<IndexMode>,

    /// Object-store backend, `memory` or `cloud` (overrides REPORT_DROP_STORE_BACKEND)
    #[arg(long)]
    pub store_backend: Option<StoreBackend>,

    /// Database URL for the sqlite catalog (overrides REPORT_DROP_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Display-names file (overrides REPORT_DROP_NAMES_FILE)
    #[arg(long)]
    pub names_file: Option<String>,

    /// Apply the catalog schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    ///
    /// The admin password has no default and no CLI flag; it only ever
    /// arrives through the environment.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("REPORT_DROP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("REPORT_DROP_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing REPORT_DROP_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading REPORT_DROP_PORT"),
        };
        let env_index = match env::var("REPORT_DROP_INDEX_MODE") {
            Ok(value) => value
                .parse::<IndexMode>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("parsing REPORT_DROP_INDEX_MODE value `{}`", value))?,
            Err(env::VarError::NotPresent) => IndexMode::Listing,
            Err(err) => return Err(err).context("reading REPORT_DROP_INDEX_MODE"),
        };
        let env_backend = match env::var("REPORT_DROP_STORE_BACKEND") {
            Ok(value) => value
                .parse::<StoreBackend>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("parsing REPORT_DROP_STORE_BACKEND value `{}`", value))?,
            Err(env::VarError::NotPresent) => StoreBackend::Memory,
            Err(err) => return Err(err).context("reading REPORT_DROP_STORE_BACKEND"),
        };
        let env_db = env::var("REPORT_DROP_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/report_drop.db".into());
        let env_names = env::var("REPORT_DROP_NAMES_FILE")
            .unwrap_or_else(|_| "./data/names.json".into());

        let admin_password = env::var("REPORT_DROP_ADMIN_PASSWORD")
            .context("REPORT_DROP_ADMIN_PASSWORD must be set")?;
        if admin_password.is_empty() {
            bail!("REPORT_DROP_ADMIN_PASSWORD must not be empty");
        }

        let slot_one = env::var("REPORT_DROP_SLOT_ONE").unwrap_or_else(|_| "gurdeep".into());
        let slot_two = env::var("REPORT_DROP_SLOT_TWO").unwrap_or_else(|_| "kulwinder".into());

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            admin_password,
            slot_one,
            slot_two,
            index_mode: args.index_mode.unwrap_or(env_index),
            store_backend: args.store_backend.unwrap_or(env_backend),
            database_url: args.database_url.unwrap_or(env_db),
            names_file: args.names_file.unwrap_or(env_names),
            store_folder: env::var("REPORT_DROP_STORE_FOLDER")
                .unwrap_or_else(|_| "reports".into()),
            store_url: env::var("REPORT_DROP_STORE_URL").ok(),
            store_key: env::var("REPORT_DROP_STORE_KEY").ok(),
            store_secret: env::var("REPORT_DROP_STORE_SECRET").ok(),
        };

        if cfg.store_backend == StoreBackend::Cloud
            && (cfg.store_url.is_none() || cfg.store_key.is_none() || cfg.store_secret.is_none())
        {
            bail!(
                "the cloud store backend requires REPORT_DROP_STORE_URL, \
                 REPORT_DROP_STORE_KEY and REPORT_DROP_STORE_SECRET"
            );
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
