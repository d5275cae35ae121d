//! GET /api/weather

use axum::extract::Query;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::weather::weather_for;

#[derive(Debug, Default, Deserialize)]
pub struct WeatherParams {
    pub location: Option<String>,
}

pub async fn weather(Query(params): Query<WeatherParams>) -> Json<Value> {
    Json(json!({
        "success": true,
        "weather": weather_for(params.location.as_deref()),
        "lastUpdated": Utc::now(),
    }))
}
