use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse,
            MeResponse, MessageResponse, PublicUser, RegisterRequest, RegisterResponse,
            ResetPasswordRequest,
        },
        extractors::AuthUser,
        services::AuthService,
    },
    error::{AppJson, AppResult},
    state::AppState,
};

/// Same text whether or not the email is registered.
pub const FORGOT_PASSWORD_MESSAGE: &str = "If the email exists, a reset token has been generated";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:token", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user = auth.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully".into(),
            data: user,
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let session = auth.login(payload).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        token: session.token,
        data: session.user,
    }))
}

#[instrument(skip(auth, payload))]
pub async fn forgot_password(
    State(auth): State<AuthService>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    let reset_token = auth
        .forgot_password(payload, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(ForgotPasswordResponse {
        success: true,
        message: FORGOT_PASSWORD_MESSAGE.into(),
        reset_token,
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(auth): State<AuthService>,
    Path(token): Path<String>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth.reset_password(&token, payload, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset successful".into(),
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        data: PublicUser::from(&user),
    })
}
