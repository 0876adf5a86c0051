use crate::config::AppConfig;
use crate::store::{CrmStore, MemoryStore, PgStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CrmStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url).await?;
                // Run migrations if present
                if let Err(e) = pg.migrate().await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg) as Arc<dyn CrmStore>
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using the in-memory store");
                Arc::new(MemoryStore::new()) as Arc<dyn CrmStore>
            }
        };

        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn CrmStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// Empty in-memory state with a fixed test secret.
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(AppConfig::for_tests("test-secret")),
        )
    }
}
