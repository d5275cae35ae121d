//! /api/mandi-prices

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{filter_value, SharedContext};
use crate::error::AppError;
use crate::mandi::PriceQuery;

const DEFAULT_LISTING_LIMIT: usize = 50;
const DEFAULT_TREND_DAYS: usize = 30;

#[derive(Debug, Default, Deserialize)]
pub struct PriceParams {
    pub action: Option<String>,
    pub crop: Option<String>,
    pub state: Option<String>,
    pub market: Option<String>,
    pub limit: Option<usize>,
    pub days: Option<usize>,
}

/// GET: `action` selects trends, compare, update or status; anything else
/// lists stored prices.
pub async fn query(
    State(ctx): State<SharedContext>,
    params: Result<Query<PriceParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let crop = filter_value(params.crop);

    match params.action.as_deref() {
        Some("trends") => {
            let crop = crop.ok_or_else(|| AppError::bad_request("Crop is required for trends"))?;
            let days = params.days.unwrap_or(DEFAULT_TREND_DAYS);
            let trends = ctx.aggregator.price_trends(&crop, days).await?;
            return Ok(Json(json!({ "success": true, "trends": trends })));
        }
        Some("compare") => {
            let crop =
                crop.ok_or_else(|| AppError::bad_request("Crop is required for comparison"))?;
            let comparison = ctx.aggregator.compare_markets(&crop).await?;
            return Ok(Json(json!({ "success": true, "comparison": comparison })));
        }
        Some("update") => {
            let result = ctx.aggregator.update_all_prices().await;
            return Ok(Json(json!({ "success": result.success, "result": result })));
        }
        Some("status") => {
            let status = ctx.aggregator.update_status().await;
            return Ok(Json(json!({ "success": true, "status": status })));
        }
        _ => {}
    }

    let listing = ctx
        .aggregator
        .list_prices(&PriceQuery {
            crop,
            state: filter_value(params.state),
            market: filter_value(params.market),
            limit: params.limit.unwrap_or(DEFAULT_LISTING_LIMIT),
        })
        .await;

    Ok(Json(json!({
        "success": true,
        "prices": listing.prices,
        "total": listing.total,
        "filters": listing.filters,
        "lastUpdated": listing.last_updated,
    })))
}

/// POST: run an aggregation now
pub async fn update(State(ctx): State<SharedContext>) -> Result<Json<Value>, AppError> {
    let result = ctx.aggregator.update_all_prices().await;
    Ok(Json(json!({
        "success": result.success,
        "message": format!(
            "Updated {} prices from {} sources",
            result.total_updated,
            result.sources.len()
        ),
        "result": result,
    })))
}
