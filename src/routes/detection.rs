//! /api/disease-detection

use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{filter_value, SharedContext};
use crate::detection::{DetectionRequest, ImageUpload};
use crate::error::AppError;

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// POST: multipart form with `image` plus optional `userId`, `cropType`, `location`
pub async fn detect(
    State(ctx): State<SharedContext>,
    mut form: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut image = None;
    let mut request = DetectionRequest::default();

    while let Some(field) = form.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "userId" => request.user_id = non_empty(field.text().await?),
            "cropType" => request.crop_type = non_empty(field.text().await?),
            "location" => request.location = non_empty(field.text().await?),
            _ => {}
        }
    }

    let image = image.ok_or_else(|| AppError::bad_request("No image provided"))?;
    let result = ctx.detection.analyze(image, request).await?;

    Ok(Json(json!({ "success": true, "result": result })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<usize>,
    pub crop: Option<String>,
    pub disease: Option<String>,
}

/// GET: a user's detection history, or the disease catalogue with
/// `action=diseases` (optionally by `crop`) and `action=info&disease=`
pub async fn history(
    State(ctx): State<SharedContext>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(params) = params?;
    let detector = ctx.detection.detector();

    match params.action.as_deref() {
        Some("diseases") => {
            let diseases = match filter_value(params.crop) {
                Some(crop) => detector.diseases_by_crop(&crop),
                None => detector.supported_diseases(),
            };
            return Ok(Json(json!({ "success": true, "diseases": diseases })));
        }
        Some("info") => {
            let name = filter_value(params.disease)
                .ok_or_else(|| AppError::bad_request("Disease name is required"))?;
            let info = detector
                .disease_info(&name)
                .ok_or_else(|| AppError::not_found(format!("Unknown disease {name}")))?;
            return Ok(Json(json!({ "success": true, "disease": info })));
        }
        _ => {}
    }

    let user_id = params
        .user_id
        .and_then(non_empty)
        .ok_or_else(|| AppError::bad_request("User ID is required"))?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    let history = ctx.detection.history(&user_id, limit).await;
    Ok(Json(json!({
        "success": true,
        "detections": history.detections,
        "total": history.total,
        "hasMore": history.has_more,
    })))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
