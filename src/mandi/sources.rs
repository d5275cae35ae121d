//! Upstream mandi price sources
//!
//! Each source returns a batch of quotes dated today. The built-in sources
//! serve fixed quotes after a simulated network delay.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use crate::store::models::NewPrice;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// A named upstream that yields price quotes
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<NewPrice>, SourceError>;
}

/// Fixed quote served by a [`MockSource`]
#[derive(Debug, Clone)]
struct Quote {
    crop: &'static str,
    variety: &'static str,
    market: &'static str,
    state: &'static str,
    district: &'static str,
    min: f64,
    max: f64,
    modal: f64,
}

/// Simulated source with fixed quotes and random latency
pub struct MockSource {
    name: &'static str,
    quotes: Vec<Quote>,
    latency_ms: RangeInclusive<u64>,
}

impl MockSource {
    pub fn agmarknet(latency_ms: RangeInclusive<u64>) -> Self {
        Self {
            name: "AgMarkNet",
            quotes: vec![
                Quote {
                    crop: "Wheat",
                    variety: "HD-2967",
                    market: "Karnal Mandi",
                    state: "Haryana",
                    district: "Karnal",
                    min: 2100.0,
                    max: 2300.0,
                    modal: 2200.0,
                },
                Quote {
                    crop: "Rice",
                    variety: "Basmati",
                    market: "Amritsar Mandi",
                    state: "Punjab",
                    district: "Amritsar",
                    min: 3500.0,
                    max: 4000.0,
                    modal: 3750.0,
                },
                Quote {
                    crop: "Tomato",
                    variety: "Hybrid",
                    market: "Delhi Azadpur Mandi",
                    state: "Delhi",
                    district: "North Delhi",
                    min: 800.0,
                    max: 1200.0,
                    modal: 1000.0,
                },
            ],
            latency_ms,
        }
    }

    pub fn enam(latency_ms: RangeInclusive<u64>) -> Self {
        Self {
            name: "eNAM",
            quotes: vec![
                Quote {
                    crop: "Onion",
                    variety: "Nasik Red",
                    market: "Nashik Mandi",
                    state: "Maharashtra",
                    district: "Nashik",
                    min: 2000.0,
                    max: 2500.0,
                    modal: 2250.0,
                },
                Quote {
                    crop: "Potato",
                    variety: "Jyoti",
                    market: "Agra Mandi",
                    state: "Uttar Pradesh",
                    district: "Agra",
                    min: 1200.0,
                    max: 1500.0,
                    modal: 1350.0,
                },
            ],
            latency_ms,
        }
    }

    pub fn data_gov(latency_ms: RangeInclusive<u64>) -> Self {
        Self {
            name: "Data.gov.in",
            quotes: vec![
                Quote {
                    crop: "Cotton",
                    variety: "Shankar-6",
                    market: "Guntur Mandi",
                    state: "Andhra Pradesh",
                    district: "Guntur",
                    min: 5800.0,
                    max: 6200.0,
                    modal: 6000.0,
                },
                Quote {
                    crop: "Sugarcane",
                    variety: "Co-86032",
                    market: "Muzaffarnagar Mandi",
                    state: "Uttar Pradesh",
                    district: "Muzaffarnagar",
                    min: 280.0,
                    max: 320.0,
                    modal: 300.0,
                },
            ],
            latency_ms,
        }
    }

    /// The three built-in sources sharing one latency range
    pub fn defaults(latency_ms: RangeInclusive<u64>) -> Vec<Self> {
        vec![
            Self::agmarknet(latency_ms.clone()),
            Self::enam(latency_ms.clone()),
            Self::data_gov(latency_ms),
        ]
    }

    fn draw_latency(&self) -> Duration {
        let (lo, hi) = (*self.latency_ms.start(), *self.latency_ms.end());
        if hi <= lo {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

#[async_trait]
impl PriceSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self) -> Result<Vec<NewPrice>, SourceError> {
        let latency = self.draw_latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let today = Utc::now().date_naive();
        Ok(self
            .quotes
            .iter()
            .map(|q| NewPrice {
                crop: q.crop.to_string(),
                variety: Some(q.variety.to_string()),
                market: q.market.to_string(),
                state: q.state.to_string(),
                district: Some(q.district.to_string()),
                min_price: q.min,
                max_price: q.max,
                modal_price: q.modal,
                price_date: today,
                unit: "per quintal".to_string(),
                source: Some(self.name.to_string()),
            })
            .collect())
    }
}
