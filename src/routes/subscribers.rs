use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use crate::AppState;
use crate::error::{Error, Result};
use crate::models::{Subscribe, Subscriber};
use crate::routes::admin::extract_admin_user;

pub fn subscribers_routes() -> Router<AppState> {
    Router::new().route("/", get(list_subscribers).post(subscribe))
}

async fn subscribe(
    State(state): State<AppState>,
    Json(input): Json<Subscribe>,
) -> Result<impl IntoResponse> {
    let email = input.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(Error::validation("Invalid email"));
    }

    let result = sqlx::query(
        "INSERT INTO subscribers (email, subscribed_at) VALUES (?, ?) ON CONFLICT(email) DO NOTHING",
    )
    .bind(&email)
    .bind(Utc::now())
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok((
            StatusCode::OK,
            Json(serde_json::json!({"message": "Already subscribed"})),
        ));
    }

    tracing::info!("new subscriber");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"message": "Subscribed successfully"})),
    ))
}

async fn list_subscribers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let subscribers = sqlx::query_as::<_, Subscriber>(
        "SELECT * FROM subscribers ORDER BY subscribed_at DESC, id DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(subscribers))
}
