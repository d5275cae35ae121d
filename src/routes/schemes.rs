//! /api/government-schemes

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{filter_value, SharedContext};
use crate::error::AppError;
use crate::schemes::{DocumentUpload, SchemeSearch, UserProfile};
use crate::store::models::{SchemeStatus, User};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeParams {
    pub action: Option<String>,
    pub query: Option<String>,
    pub category: Option<String>,
    pub state: Option<String>,
    pub status: Option<SchemeStatus>,
    pub user_id: Option<String>,
    pub scheme_id: Option<String>,
    pub application_id: Option<String>,
}

/// GET: `action` selects categories, recommendations, eligibility,
/// applications or application; anything else searches active schemes.
pub async fn query(
    State(ctx): State<SharedContext>,
    params: Result<Query<SchemeParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;

    match params.action.as_deref() {
        Some("categories") => {
            let categories = ctx.schemes.categories().await;
            return Ok(Json(json!({ "success": true, "categories": categories })));
        }
        Some("recommendations") => {
            let user_id = required(params.user_id, "User ID is required")?;
            let user = find_user(&ctx, &user_id).await?;
            let recommendations = ctx
                .schemes
                .recommendations(&UserProfile::from_user(&user))
                .await;
            return Ok(Json(json!({ "success": true, "recommendations": recommendations })));
        }
        Some("eligibility") => {
            let (Some(scheme_id), Some(user_id)) = (
                filter_value(params.scheme_id),
                filter_value(params.user_id),
            ) else {
                return Err(AppError::bad_request("Scheme ID and User ID are required"));
            };
            let user = find_user(&ctx, &user_id).await?;
            let eligibility = ctx
                .schemes
                .check_eligibility(&scheme_id, &UserProfile::from_user(&user))
                .await?;
            return Ok(Json(json!({ "success": true, "eligibility": eligibility })));
        }
        Some("applications") => {
            let user_id = required(params.user_id, "User ID is required")?;
            let applications = ctx.schemes.applications_for_user(&user_id).await;
            return Ok(Json(json!({
                "success": true,
                "total": applications.len(),
                "applications": applications,
            })));
        }
        Some("application") => {
            let application_id = required(params.application_id, "Application ID is required")?;
            let application = ctx
                .schemes
                .application_status(&application_id)
                .await
                .ok_or_else(|| AppError::not_found("Application not found"))?;
            return Ok(Json(json!({ "success": true, "application": application })));
        }
        _ => {}
    }

    let search = SchemeSearch {
        query: params.query.unwrap_or_default(),
        category: filter_value(params.category),
        state: filter_value(params.state),
        status: Some(params.status.unwrap_or(SchemeStatus::Active)),
    };
    let schemes = ctx.schemes.search(&search).await;

    Ok(Json(json!({
        "success": true,
        "total": schemes.len(),
        "schemes": schemes,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeAction {
    pub action: String,
    pub user_id: Option<String>,
    pub scheme_id: Option<String>,
    pub application_id: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentUpload>,
}

/// POST: `update` refreshes scheme data, `apply` drafts an application,
/// `submit` submits a draft.
pub async fn action(
    State(ctx): State<SharedContext>,
    payload: Result<Json<SchemeAction>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;

    match body.action.as_str() {
        "update" => {
            let result = ctx.schemes.update_scheme_data().await;
            Ok(Json(json!({
                "success": result.success,
                "message": format!("Updated {} schemes", result.updated),
                "result": result,
            })))
        }
        "apply" => {
            let (Some(user_id), Some(scheme_id)) =
                (filter_value(body.user_id), filter_value(body.scheme_id))
            else {
                return Err(AppError::bad_request("Scheme ID and User ID are required"));
            };
            let application = ctx
                .schemes
                .create_application(&user_id, &scheme_id, body.documents)
                .await?;
            Ok(Json(json!({ "success": true, "application": application })))
        }
        "submit" => {
            let application_id = required(body.application_id, "Application ID is required")?;
            let application = ctx.schemes.submit_application(&application_id).await?;
            Ok(Json(json!({
                "success": true,
                "message": "Application submitted successfully",
                "application": application,
            })))
        }
        _ => Err(AppError::bad_request("Invalid action")),
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    filter_value(value).ok_or_else(|| AppError::bad_request(message))
}

async fn find_user(ctx: &SharedContext, user_id: &str) -> Result<User, AppError> {
    ctx.store
        .users
        .find_by_id(user_id)
        .await
        .ok_or_else(|| AppError::not_found("User not found"))
}
