use crate::config::{AppConfig, StoreBackend};
use crate::locks::UserLocks;
use crate::store::{MemoryStore, PgProfileStore, ProfileStore};
use crate::vision::{OpenAiVision, VisionClient};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ProfileStore>,
    pub vision: Arc<dyn VisionClient>,
    pub locks: UserLocks,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL missing")?;
                let pg = PgProfileStore::connect(url, config.database_max_connections).await?;
                pg.migrate().await?;
                Arc::new(pg) as Arc<dyn ProfileStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn ProfileStore>
            }
        };

        let vision = Arc::new(OpenAiVision::new(&config.vision)?) as Arc<dyn VisionClient>;

        Ok(Self::from_parts(config, store, vision))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn ProfileStore>,
        vision: Arc<dyn VisionClient>,
    ) -> Self {
        Self {
            config,
            store,
            vision,
            locks: UserLocks::new(),
        }
    }

    pub async fn shutdown(&self) {
        self.store.close().await;
    }

    /// In-memory store and a vision model that always returns `analysis`.
    #[cfg(test)]
    pub fn fake(analysis: serde_json::Value) -> Self {
        use crate::config::VisionConfig;
        use crate::vision::fake::CannedVision;

        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 1,
            vision: VisionConfig {
                api_key: None,
                base_url: "http://fake.local".into(),
                model: "fake".into(),
                max_tokens: 1,
                timeout_secs: 1,
            },
            max_upload_bytes: 1024 * 1024,
        });

        Self::from_parts(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(CannedVision(analysis)),
        )
    }
}
