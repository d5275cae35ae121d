//! Mandi price aggregation
//!
//! Pulls quotes from every configured [`PriceSource`] concurrently, writes
//! them to the record store, and derives trend, comparison and alert views
//! from the stored rows.
//!
//! Only one aggregation run may be in flight. A second call while a run is
//! active returns immediately with an "already in progress" summary.

pub mod sources;

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::MandiConfig;
use crate::store::models::{MandiPrice, NewEvent, NewNotification, NotificationKind, Priority};
use crate::store::RecordStore;
pub use sources::{MockSource, PriceSource, SourceError};

/// Percentage change inside which a trend counts as stable
const TREND_DEADBAND_PCT: f64 = 2.0;

/// Rows after the latest one averaged for percentage alerts
const ALERT_WINDOW: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum MandiError {
    #[error("No price data found for {0}")]
    NoData(String),
}

// =============================================================================
// Alert subscriptions
// =============================================================================

/// A user's price alert subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub user_id: String,
    pub crop: String,
    /// Only consider quotes from this state
    #[serde(default)]
    pub state: Option<String>,
    /// Only consider quotes from this market
    #[serde(default)]
    pub market: Option<String>,
    #[serde(flatten)]
    pub kind: AlertKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "alert_type", rename_all = "snake_case")]
pub enum AlertKind {
    /// Latest price rose at least `percentage` over the trailing average
    PriceIncrease { percentage: f64 },
    /// Latest price fell at least `percentage` below the trailing average
    PriceDecrease { percentage: f64 },
    /// Latest price reached `threshold`
    Threshold { threshold: f64 },
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub success: bool,
    pub total_updated: usize,
    pub errors: Vec<String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTrend {
    pub crop: String,
    pub current_price: f64,
    pub previous_price: f64,
    pub change: f64,
    pub change_percentage: f64,
    pub trend: TrendDirection,
    pub history: Vec<PricePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketQuote {
    pub market: String,
    pub state: String,
    pub price: f64,
    pub date: NaiveDate,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketPrice {
    pub market: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketComparison {
    pub crop: String,
    pub markets: Vec<MarketQuote>,
    pub highest_price: MarketPrice,
    pub lowest_price: MarketPrice,
    pub average_price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggeredAlert {
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertReport {
    pub alerts_triggered: usize,
    pub notifications: Vec<TriggeredAlert>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub is_updating: bool,
    pub last_update_time: Option<DateTime<Utc>>,
    pub next_update_time: Option<DateTime<Utc>>,
}

/// Filters for the price listing; `None` matches everything
#[derive(Debug, Clone, Default)]
pub struct PriceQuery {
    pub crop: Option<String>,
    pub state: Option<String>,
    pub market: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceFilters {
    pub crops: Vec<String>,
    pub states: Vec<String>,
    pub markets: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceListing {
    pub prices: Vec<MandiPrice>,
    pub total: usize,
    pub filters: PriceFilters,
    pub last_updated: Option<DateTime<Utc>>,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Clears the in-flight flag when a run ends, including on panic
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PriceAggregator {
    store: Arc<RecordStore>,
    sources: Vec<Arc<dyn PriceSource>>,
    alerts: Vec<PriceAlert>,
    fetch_timeout: Duration,
    /// `None` when the configured interval does not fit a calendar offset
    update_interval: Option<chrono::Duration>,
    updating: AtomicBool,
    last_update: RwLock<Option<DateTime<Utc>>>,
}

impl PriceAggregator {
    /// Aggregator over the built-in sources
    pub fn new(store: Arc<RecordStore>, config: &MandiConfig) -> Self {
        let sources = MockSource::defaults(config.min_latency_ms..=config.max_latency_ms)
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn PriceSource>)
            .collect();
        Self::with_sources(store, config, sources)
    }

    pub fn with_sources(
        store: Arc<RecordStore>,
        config: &MandiConfig,
        sources: Vec<Arc<dyn PriceSource>>,
    ) -> Self {
        Self {
            store,
            sources,
            alerts: config.alerts.clone(),
            fetch_timeout: Duration::from_millis(config.fetch_timeout_ms),
            update_interval: chrono::Duration::from_std(Duration::from_secs(
                config.update_interval_secs,
            ))
            .ok(),
            updating: AtomicBool::new(false),
            last_update: RwLock::new(None),
        }
    }

    /// Fetch from every source concurrently and store the results.
    ///
    /// One failing source never aborts the others; its error is recorded in
    /// the summary and `success` is false whenever any error occurred.
    pub async fn update_all_prices(&self) -> UpdateSummary {
        let Some(_guard) = RunGuard::acquire(&self.updating) else {
            warn!("Price update requested while another run is active");
            return UpdateSummary {
                success: false,
                total_updated: 0,
                errors: vec!["Update already in progress".to_string()],
                sources: Vec::new(),
            };
        };

        info!(sources = self.sources.len(), "Starting mandi price update");

        let mut fetches: FuturesUnordered<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = source.clone();
                let timeout = self.fetch_timeout;
                async move {
                    let result = match tokio::time::timeout(timeout, source.fetch()).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::Timeout(timeout)),
                    };
                    (source.name().to_string(), result)
                }
            })
            .collect();

        let mut errors = Vec::new();
        let mut succeeded = Vec::new();
        let mut total_updated = 0;

        // Rows are written as each source completes
        while let Some((name, result)) = fetches.next().await {
            match result {
                Ok(rows) => {
                    debug!(source = %name, rows = rows.len(), "Source returned quotes");
                    for row in rows {
                        let crop = row.crop.clone();
                        match self.store.prices.create(row).await {
                            Ok(_) => total_updated += 1,
                            Err(e) => errors.push(format!("{crop} from {name}: {e}")),
                        }
                    }
                    succeeded.push(name);
                }
                Err(e) => {
                    warn!(source = %name, error = %e, "Price source failed");
                    errors.push(format!("{name}: {e}"));
                }
            }
        }

        let finished = Utc::now();
        *self.last_update.write().await = Some(finished);

        let event = NewEvent::new(
            "mandi_price_update",
            json!({
                "totalUpdated": total_updated,
                "sources": succeeded.len(),
                "errors": errors.len(),
                "updateTime": finished.to_rfc3339(),
            }),
        );
        if let Err(e) = self.store.log_event(event).await {
            warn!(error = %e, "Failed to log price update event");
        }

        info!(
            total_updated,
            sources = succeeded.len(),
            errors = errors.len(),
            "Mandi price update finished"
        );

        UpdateSummary {
            success: errors.is_empty(),
            total_updated,
            errors,
            sources: succeeded,
        }
    }

    /// Latest-vs-previous movement for a crop plus up to `days` history points
    pub async fn price_trends(&self, crop: &str, days: usize) -> Result<PriceTrend, MandiError> {
        let mut prices = self.store.prices_by_crop(crop).await;
        if prices.is_empty() {
            return Err(MandiError::NoData(crop.to_string()));
        }
        sort_newest_first(&mut prices);

        let current_price = prices[0].modal_price;
        let previous_price = prices.get(1).map_or(current_price, |p| p.modal_price);
        let change = current_price - previous_price;
        let change_percentage = if previous_price > 0.0 {
            change / previous_price * 100.0
        } else {
            0.0
        };

        let trend = if change_percentage.abs() <= TREND_DEADBAND_PCT {
            TrendDirection::Stable
        } else if change_percentage > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };

        let history = prices
            .iter()
            .take(days)
            .map(|p| PricePoint {
                date: p.price_date,
                price: p.modal_price,
            })
            .collect();

        Ok(PriceTrend {
            crop: crop.to_string(),
            current_price,
            previous_price,
            change,
            change_percentage,
            trend,
            history,
        })
    }

    /// Latest quote per (market, state), ranked by price, highest first
    pub async fn compare_markets(&self, crop: &str) -> Result<MarketComparison, MandiError> {
        let prices = self.store.prices_by_crop(crop).await;

        let mut latest: HashMap<(String, String), MandiPrice> = HashMap::new();
        for price in prices {
            let key = (price.market.clone(), price.state.clone());
            match latest.get(&key) {
                Some(existing) if newest_first(&price, existing) != CmpOrdering::Less => {}
                _ => {
                    latest.insert(key, price);
                }
            }
        }

        let mut markets: Vec<MarketQuote> = latest
            .into_values()
            .map(|p| MarketQuote {
                market: p.market,
                state: p.state,
                price: p.modal_price,
                date: p.price_date,
                rank: 0,
            })
            .collect();
        markets.sort_by(|a, b| b.price.total_cmp(&a.price));
        for (index, market) in markets.iter_mut().enumerate() {
            market.rank = index + 1;
        }

        let (Some(highest), Some(lowest)) = (markets.first(), markets.last()) else {
            return Err(MandiError::NoData(crop.to_string()));
        };
        let highest_price = MarketPrice {
            market: highest.market.clone(),
            price: highest.price,
        };
        let lowest_price = MarketPrice {
            market: lowest.market.clone(),
            price: lowest.price,
        };
        let average_price = markets.iter().map(|m| m.price).sum::<f64>() / markets.len() as f64;

        Ok(MarketComparison {
            crop: crop.to_string(),
            markets,
            highest_price,
            lowest_price,
            average_price,
        })
    }

    /// Evaluate every alert subscription and notify the triggered users
    pub async fn check_price_alerts(&self) -> AlertReport {
        let mut triggered = Vec::new();

        for alert in &self.alerts {
            let mut prices: Vec<MandiPrice> = self
                .store
                .prices_by_crop(&alert.crop)
                .await
                .into_iter()
                .filter(|p| matches_filter(&p.state, alert.state.as_deref()))
                .filter(|p| matches_filter(&p.market, alert.market.as_deref()))
                .collect();
            if prices.is_empty() {
                continue;
            }
            sort_newest_first(&mut prices);

            let Some(message) = evaluate_alert(alert, &prices) else {
                continue;
            };

            let draft = NewNotification {
                user_id: alert.user_id.clone(),
                title: format!("Price Alert: {}", alert.crop),
                message: message.clone(),
                kind: NotificationKind::PriceUpdate,
                priority: Priority::Medium,
            };
            if let Err(e) = self.store.notifications.create(draft).await {
                warn!(user_id = %alert.user_id, error = %e, "Failed to store price alert");
                continue;
            }

            info!(user_id = %alert.user_id, crop = %alert.crop, "Price alert triggered");
            triggered.push(TriggeredAlert {
                user_id: alert.user_id.clone(),
                message,
                kind: NotificationKind::PriceUpdate,
            });
        }

        AlertReport {
            alerts_triggered: triggered.len(),
            notifications: triggered,
        }
    }

    pub async fn update_status(&self) -> UpdateStatus {
        let last_update_time = *self.last_update.read().await;
        UpdateStatus {
            is_updating: self.updating.load(Ordering::Acquire),
            last_update_time,
            next_update_time: last_update_time
                .zip(self.update_interval)
                .and_then(|(last, interval)| last.checked_add_signed(interval)),
        }
    }

    /// Filtered listing, newest first, with the distinct values for filter menus
    pub async fn list_prices(&self, query: &PriceQuery) -> PriceListing {
        let all = self.store.prices.all().await;

        let mut crops = BTreeSet::new();
        let mut states = BTreeSet::new();
        let mut markets = BTreeSet::new();
        for price in &all {
            crops.insert(price.crop.clone());
            states.insert(price.state.clone());
            markets.insert(price.market.clone());
        }

        let mut prices: Vec<MandiPrice> = all
            .into_iter()
            .filter(|p| matches_filter(&p.crop, query.crop.as_deref()))
            .filter(|p| matches_filter(&p.state, query.state.as_deref()))
            .filter(|p| matches_filter(&p.market, query.market.as_deref()))
            .collect();
        let total = prices.len();
        sort_newest_first(&mut prices);
        prices.truncate(query.limit);

        PriceListing {
            prices,
            total,
            filters: PriceFilters {
                crops: crops.into_iter().collect(),
                states: states.into_iter().collect(),
                markets: markets.into_iter().collect(),
            },
            last_updated: *self.last_update.read().await,
        }
    }
}

/// Newest price date first, ties broken by newest insertion
fn newest_first(a: &MandiPrice, b: &MandiPrice) -> CmpOrdering {
    b.price_date
        .cmp(&a.price_date)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

fn sort_newest_first(prices: &mut [MandiPrice]) {
    prices.sort_by(newest_first);
}

/// Case-insensitive substring filter; `None` matches everything
fn matches_filter(value: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |f| value.to_lowercase().contains(&f.to_lowercase()))
}

/// Message for a triggered alert; `prices` must be sorted newest first
fn evaluate_alert(alert: &PriceAlert, prices: &[MandiPrice]) -> Option<String> {
    let latest = prices.first()?.modal_price;

    match alert.kind {
        AlertKind::Threshold { threshold } => (latest >= threshold).then(|| {
            format!(
                "{} price has reached ₹{}/quintal, crossing your threshold of ₹{}/quintal",
                alert.crop, latest, threshold
            )
        }),
        AlertKind::PriceIncrease { percentage } => {
            let change = change_from_trailing_average(latest, prices)?;
            (change >= percentage).then(|| {
                format!(
                    "{} price increased by {:.1}% to ₹{}/quintal",
                    alert.crop, change, latest
                )
            })
        }
        AlertKind::PriceDecrease { percentage } => {
            let change = change_from_trailing_average(latest, prices)?;
            (-change >= percentage).then(|| {
                format!(
                    "{} price decreased by {:.1}% to ₹{}/quintal",
                    alert.crop, -change, latest
                )
            })
        }
    }
}

fn change_from_trailing_average(latest: f64, prices: &[MandiPrice]) -> Option<f64> {
    let window: Vec<f64> = prices
        .iter()
        .skip(1)
        .take(ALERT_WINDOW)
        .map(|p| p.modal_price)
        .collect();
    if window.is_empty() {
        return None;
    }
    let average = window.iter().sum::<f64>() / window.len() as f64;
    if average <= 0.0 {
        return None;
    }
    Some((latest - average) / average * 100.0)
}
