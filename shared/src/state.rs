use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client as S3Client;
use cakewalk_atoms::catalog::{LandingGuard, ListOptions, SweepGuard};
use cakewalk_atoms::store::{MemoryStore, ObjectStore, TimeoutStore};
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::s3_store::S3Store;

/// Everything a request handler needs. Built once per Lambda container.
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub guard: Arc<dyn LandingGuard>,
    pub config: Config,
}

impl AppState {
    pub async fn from_config(config: Config) -> Self {
        let store: Arc<dyn ObjectStore> = match config.backend {
            StoreBackend::S3 => {
                let aws = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                let s3 = S3Store::new(S3Client::new(&aws), &config.bucket, &config.region);
                tracing::info!("🪣 using S3 bucket {} in {}", config.bucket, config.region);
                Arc::new(TimeoutStore::new(s3, config.store_call_timeout))
            }
            StoreBackend::Memory => {
                tracing::warn!("⚠️ STORE_BACKEND=memory: images live only as long as this process");
                Arc::new(TimeoutStore::new(
                    MemoryStore::new(&config.bucket),
                    config.store_call_timeout,
                ))
            }
        };

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let guard: Arc<dyn LandingGuard> = Arc::new(SweepGuard::new(config.sweep_concurrency));
        Self {
            store,
            guard,
            config,
        }
    }

    pub fn list_options(&self) -> ListOptions {
        ListOptions {
            presign_expiry: self.config.presign_expiry,
            concurrency: self.config.sweep_concurrency,
        }
    }
}
