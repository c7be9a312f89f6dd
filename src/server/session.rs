use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;
use url::form_urlencoded;

use crate::database::entities::users;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::{user_service, AuthError, AuthService};

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_PATH: &str = "/account/login/";

/// The account behind the request's session, if any.
///
/// An unknown or expired token is treated like no token at all.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Option<users::Model>);

impl CurrentUser {
    pub fn user(&self) -> Option<&users::Model> {
        self.0.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    /// The logged-in user, or the anonymous account standing in for visitors.
    pub async fn or_anonymous(&self, state: &AppState) -> Result<users::Model, ApiError> {
        match &self.0 {
            Some(user) => Ok(user.clone()),
            None => Ok(user_service::anonymous_user(&state.db).await?),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(CurrentUser(None));
        };

        match AuthService::new(state.db.clone()).session_user(&token).await {
            Ok(user) => Ok(CurrentUser(Some(user))),
            Err(AuthError::DatabaseError(message)) => Err(ApiError::Internal(message)),
            Err(err) => {
                debug!("Ignoring session token: {}", err);
                Ok(CurrentUser(None))
            }
        }
    }
}

/// Reads the session token from a bearer header or the `sessionid` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie carrying a new session.
pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that clears the session on the client.
pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// `302 Found` to the login page, remembering where the visitor was going.
pub fn login_redirect(next: &str) -> Response {
    let next: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    found(&format!("{}?next={}", LOGIN_PATH, next))
}

/// A plain `302 Found`; axum's `Redirect` only offers 303 and 307/308.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
