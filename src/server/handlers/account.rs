use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::{expired_session_cookie, session_cookie, session_token};
use crate::services::{AuthError, AuthService};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login_page() -> Json<Value> {
    Json(json!({
        "message": "Authentication required",
        "login": "POST /account/login with {\"username\", \"password\"}",
    }))
}

#[utoipa::path(
    post,
    path = "/account/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; the session token is also set as cookie"),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (user, session) = AuthService::new(state.db.clone())
        .login(&request.username, &request.password)
        .await?;

    let body = Json(json!({
        "token": session.token,
        "username": user.username,
        "expires_at": session.expires_at,
    }));
    Ok((jar.add(session_cookie(&session.token)), body).into_response())
}

#[utoipa::path(
    post,
    path = "/account/logout",
    responses(
        (status = 200, description = "Session closed")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        match AuthService::new(state.db.clone()).logout(&token).await {
            Ok(()) | Err(AuthError::SessionNotFound) => {}
            Err(err) => return Err(err.into()),
        }
    }

    Ok((jar.add(expired_session_cookie()), Json(json!({ "success": true }))).into_response())
}
