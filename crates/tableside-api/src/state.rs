//! Application state wiring the session hub to its SQLite store.
//!
//! AppState is shared by the CLI commands and the HTTP/WebSocket server. The
//! hub is generic over its repository; here it is pinned to the infra
//! implementation.

use std::path::PathBuf;
use std::sync::Arc;

use tableside_core::session::SessionHub;
use tableside_infra::config::load_server_config;
use tableside_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use tableside_infra::sqlite::pool::{DatabasePool, database_url};
use tableside_infra::sqlite::session::SqliteSessionRepository;
use tableside_types::config::ServerConfig;

pub type ConcreteSessionHub = SessionHub<SqliteSessionRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ConcreteSessionHub>,
    pub config: Arc<ServerConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, open the database.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_at(resolve_data_dir()).await
    }

    pub async fn init_at(data_dir: PathBuf) -> anyhow::Result<Self> {
        ensure_data_dir(&data_dir).await?;

        let config = load_server_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir, &config.database_file)).await?;

        let repo = Arc::new(SqliteSessionRepository::new(db_pool.clone()));
        let hub = Arc::new(SessionHub::new(repo, config.hand_delivery));

        tracing::debug!(
            data_dir = %data_dir.display(),
            database = %config.database_file,
            hand_delivery = ?config.hand_delivery,
            "application state initialized"
        );

        Ok(Self {
            hub,
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}
