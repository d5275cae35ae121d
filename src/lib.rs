//! crop-support - farmer support service
//!
//! Crop disease detection, mandi price aggregation, government scheme
//! discovery and eligibility, weather advice and admin analytics behind
//! one HTTP API.
//!
//! All state lives in an in-process [`store::RecordStore`] owned by the
//! [`AppContext`]. Nothing is persisted across restarts.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod detection;
pub mod error;
pub mod mandi;
pub mod routes;
pub mod scheduler;
pub mod schemes;
pub mod store;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::analytics::AnalyticsService;
use crate::auth::{AuthError, AuthService};
use crate::config::Config;
use crate::detection::{DetectionService, DiseaseDetector};
use crate::mandi::PriceAggregator;
use crate::scheduler::TaskRunner;
use crate::schemes::SchemeService;
use crate::store::{RecordStore, StoreError};

/// Scheduled task names
pub const MANDI_TASK: &str = "mandi-prices";
pub const SCHEMES_TASK: &str = "schemes";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Auth setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to seed schemes: {0}")]
    Seed(#[from] StoreError),
}

/// Services shared by every handler and scheduled task
pub struct AppContext {
    pub config: Config,
    pub store: Arc<RecordStore>,
    pub detector: Arc<DiseaseDetector>,
    pub detection: DetectionService,
    pub aggregator: Arc<PriceAggregator>,
    pub schemes: Arc<SchemeService>,
    pub auth: AuthService,
    pub analytics: AnalyticsService,
    pub tasks: TaskRunner,
}

impl AppContext {
    /// Build every service over a fresh store
    pub async fn new(config: Config) -> Result<Self, StartupError> {
        let store = Arc::new(RecordStore::new());
        let detector = Arc::new(DiseaseDetector::new(&config.detection));
        let detection = DetectionService::new(
            store.clone(),
            detector.clone(),
            config.upload.clone(),
            &config.detection,
        );
        let aggregator = Arc::new(PriceAggregator::new(store.clone(), &config.mandi));
        let schemes = Arc::new(SchemeService::new(store.clone(), &config.schemes));
        let auth = AuthService::new(store.clone(), &config.auth)?;
        let analytics = AnalyticsService::new(store.clone());

        if config.schemes.seed_defaults {
            let seeded = schemes.seed_defaults().await?;
            info!(seeded, "Scheme catalogue seeded");
        }

        Ok(Self {
            config,
            store,
            detector,
            detection,
            aggregator,
            schemes,
            auth,
            analytics,
            tasks: TaskRunner::new(),
        })
    }

    /// Start the periodic price and scheme refresh loops
    pub async fn register_tasks(&self) {
        if !self.config.scheduler.enabled {
            warn!("Scheduler disabled; periodic updates will not run");
            return;
        }

        let aggregator = self.aggregator.clone();
        self.tasks
            .start(
                MANDI_TASK,
                Duration::from_secs(self.config.mandi.update_interval_secs),
                move || {
                    let aggregator = aggregator.clone();
                    async move {
                        let summary = aggregator.update_all_prices().await;
                        let alerts = aggregator.check_price_alerts().await;
                        info!(
                            updated = summary.total_updated,
                            errors = summary.errors.len(),
                            alerts = alerts.alerts_triggered,
                            "Scheduled price update finished"
                        );
                        if summary.success {
                            Ok(())
                        } else {
                            Err(summary.errors.join("; "))
                        }
                    }
                },
            )
            .await;

        let schemes = self.schemes.clone();
        self.tasks
            .start(
                SCHEMES_TASK,
                Duration::from_secs(self.config.schemes.update_interval_secs),
                move || {
                    let schemes = schemes.clone();
                    async move {
                        let summary = schemes.update_scheme_data().await;
                        if summary.success {
                            Ok(())
                        } else {
                            Err(summary.errors.join("; "))
                        }
                    }
                },
            )
            .await;
    }
}
