//! /api/notifications

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{filter_value, SharedContext};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationParams {
    pub user_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

/// GET: a user's notifications, newest first
pub async fn list(
    State(ctx): State<SharedContext>,
    params: Result<Query<NotificationParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let user_id =
        filter_value(params.user_id).ok_or_else(|| AppError::bad_request("User ID is required"))?;

    let notifications = ctx
        .store
        .notifications_for_user(&user_id, params.unread_only)
        .await;
    let unread = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Json(json!({
        "success": true,
        "total": notifications.len(),
        "unread": unread,
        "notifications": notifications,
    })))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(ctx): State<SharedContext>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let notification = ctx.store.mark_notification_read(&id).await?;
    Ok(Json(json!({ "success": true, "notification": notification })))
}
