use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::get,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{Error, Result};
use crate::models::{User, UserResponse};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

async fn get_me(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    let user = extract_current_user(&state, &headers).await?;
    Ok(Json(UserResponse::from(user)))
}

fn request_token(headers: &HeaderMap) -> Result<String> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        return value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_owned)
            .ok_or(Error::Unauthorized("Invalid authorization header"));
    }

    CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or(Error::Unauthorized("Missing authorization token"))
}

/// Resolves the caller from a bearer token, falling back to the `token` cookie.
pub async fn extract_current_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = request_token(headers)?;

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| Error::Unauthorized("Invalid token"))?;

    let user_id: i64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| Error::Unauthorized("Invalid token"))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(Error::Unauthorized("User not found"))?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert("cookie", HeaderValue::from_static("token=from-cookie"));
        assert_eq!(request_token(&headers).unwrap(), "abc");
    }

    #[test]
    fn cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; token=xyz"));
        assert_eq!(request_token(&headers).unwrap(), "xyz");
    }

    #[test]
    fn malformed_or_missing_token_is_unauthorized() {
        let mut headers = HeaderMap::new();
        assert!(matches!(request_token(&headers), Err(Error::Unauthorized(_))));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(matches!(request_token(&headers), Err(Error::Unauthorized(_))));
    }
}
