//! Authentication routes
//!
//! Registration, login, email verification and password reset. Accounts
//! and credentials live in the store; tokens are issued locally.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{Created, DataResponse, MessageResponse};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::auth::{
    EmailRequest, LoginRequest, RegisterRequest, RegisterResponse, ResetPasswordRequest,
    VerifyResetCodeRequest,
};
use crate::domain::{Profile, UserResponse};
use crate::error::ApiError;
use crate::middleware::RequestIdExt;
use crate::services::accounts;

#[derive(Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: Option<Profile>,
    /// Unix timestamp at which the presented token expires
    pub token_expires_at: i64,
}

/// POST /auth/register
///
/// Create an account and its profile, then email a verification link.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(
        request_id = headers.request_id(),
        user_type = %req.user_type,
        "Registration request"
    );

    let (user, _profile) = accounts::register(
        state.store.as_ref(),
        &state.hasher,
        &state.notifier,
        &state.workflow,
        req,
    )
    .await?;

    Ok(Created(DataResponse::new(RegisterResponse {
        user: user.into(),
        message: "Registration successful. Check your email to verify your account.".to_string(),
    })))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = accounts::login(
        state.store.as_ref(),
        &state.hasher,
        &state.tokens,
        &req.email,
        &req.password,
    )
    .await
    .map_err(|e| {
        tracing::info!(request_id = headers.request_id(), code = e.code(), "Login rejected");
        e
    })?;

    Ok(DataResponse::new(response))
}

/// GET /auth/verify-email/:token
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = accounts::verify_email(state.store.as_ref(), &token).await?;

    Ok(DataResponse::new(UserResponse::from(user)))
}

/// POST /auth/resend-verification
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    accounts::resend_verification(
        state.store.as_ref(),
        &state.notifier,
        &state.workflow,
        &req.email,
    )
    .await?;

    Ok(MessageResponse::new("Verification email sent"))
}

/// POST /auth/forgot-password
///
/// Always answers the same way so the endpoint cannot probe for accounts.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    accounts::forgot_password(
        state.store.as_ref(),
        &state.notifier,
        &state.workflow,
        &req.email,
    )
    .await?;

    Ok(MessageResponse::new(
        "If an account exists for this email, a reset code has been sent",
    ))
}

/// POST /auth/verify-reset-code
pub async fn verify_reset_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyResetCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    accounts::verify_reset_code(state.store.as_ref(), &req.email, &req.code).await?;

    Ok(MessageResponse::with_code("Reset code is valid", "RESET_CODE_VALID"))
}

/// PUT /auth/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    accounts::reset_password(
        state.store.as_ref(),
        &state.hasher,
        &state.workflow,
        &req.email,
        &req.code,
        &req.new_password,
    )
    .await?;

    Ok(MessageResponse::new("Password has been reset"))
}

/// GET /auth/me
pub async fn me(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.store.get_profile_by_user(auth.user_id()).await?;

    Ok(DataResponse::new(MeResponse {
        user: UserResponse::from(&auth.user),
        profile,
        token_expires_at: auth.claims().exp,
    }))
}
