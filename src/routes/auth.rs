//! POST /api/auth

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::SharedContext;
use crate::auth::Registration;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub action: String,
    #[serde(flatten)]
    pub registration: Registration,
}

pub async fn auth(
    State(ctx): State<SharedContext>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload?;

    match request.action.as_str() {
        "login" => {
            let session = ctx
                .auth
                .login(&request.registration.email, &request.registration.password)
                .await?;
            Ok(Json(json!({
                "success": true,
                "user": session.user,
                "token": session.token,
            })))
        }
        "register" => {
            let session = ctx.auth.register(request.registration).await?;
            Ok(Json(json!({
                "success": true,
                "message": "User registered successfully",
                "user": session.user,
                "token": session.token,
            })))
        }
        _ => Err(AppError::bad_request("Invalid action")),
    }
}
