//! /api/admin

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{filter_value, SharedContext};
use crate::analytics::Timeframe;
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    pub timeframe: Option<String>,
    pub metric: Option<String>,
}

/// GET /api/admin/analytics
pub async fn analytics(
    State(ctx): State<SharedContext>,
    params: Result<Query<AnalyticsParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let timeframe = match filter_value(params.timeframe) {
        Some(raw) => raw.parse::<Timeframe>().map_err(AppError::BadRequest)?,
        None => Timeframe::default(),
    };

    if let Some(metric) = filter_value(params.metric) {
        let data = ctx
            .analytics
            .section(&metric, timeframe)
            .await
            .ok_or_else(|| AppError::not_found(format!("Unknown metric {metric}")))?;
        return Ok(Json(json!({
            "success": true,
            "metric": metric,
            "days": timeframe.days(),
            "data": data,
        })));
    }

    let data = ctx.analytics.snapshot(timeframe).await;
    Ok(Json(json!({
        "success": true,
        "days": timeframe.days(),
        "data": data,
    })))
}

/// GET /api/admin/tasks
pub async fn tasks(State(ctx): State<SharedContext>) -> Json<Value> {
    let tasks = ctx.tasks.status().await;
    Json(json!({ "success": true, "tasks": tasks }))
}
