use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, put},
};
use bcrypt::{DEFAULT_COST, hash};
use chrono::Utc;
use serde::Deserialize;

use crate::AppState;
use crate::comment_tree::{filter_by_post, nest};
use crate::db::comments;
use crate::error::{Error, Result};
use crate::models::{CreateUser, Role, SortOrder, UpdateRole, User, UserResponse};
use crate::routes::auth::extract_current_user;
use crate::routes::comments::tree_response;

// ============================
// Helper: Extract Admin User
// ============================
pub async fn extract_admin_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let user = extract_current_user(state, headers).await?;
    if !user.is_admin() {
        return Err(Error::Forbidden("Admin access required"));
    }
    Ok(user)
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin_stats))
        .route("/comments", get(admin_list_comments))
        .route("/users", get(admin_list_users).post(admin_create_user))
        .route("/users/{user_id}/role", put(admin_update_role))
        .route("/users/{user_id}", delete(admin_delete_user))
}

// ============================
// GET /admin/stats
// ============================
async fn admin_stats(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let mut stats = serde_json::Map::new();
    for table in ["users", "posts", "categories", "comments", "subscribers"] {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&state.pool)
            .await?;
        stats.insert(table.to_string(), count.into());
    }

    Ok(Json(serde_json::Value::Object(stats)))
}

// ============================
// GET /admin/comments
// ============================
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminCommentQuery {
    post_id: Option<i64>,
}

/// Moderation view: every comment, newest first, optionally narrowed to one post.
async fn admin_list_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminCommentQuery>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let rows = comments::find_all(&state.pool, SortOrder::Desc).await?;
    let forest = nest(&rows);
    let forest = match query.post_id {
        Some(post_id) => filter_by_post(&forest, post_id),
        None => forest,
    };

    Ok(Json(tree_response(forest)))
}

// ============================
// GET /admin/users
// ============================
async fn admin_list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id DESC")
        .fetch_all(&state.pool)
        .await?;

    let responses: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(responses))
}

// ============================
// POST /admin/users
// ============================
async fn admin_create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateUser>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let name = input.name.trim();
    let email = input.email.trim().to_lowercase();
    if name.is_empty() || !email.contains('@') || input.password.is_empty() {
        return Err(Error::validation("Name, a valid email and a password are required"));
    }

    let hashed = hash(&input.password, DEFAULT_COST).map_err(anyhow::Error::from)?;
    let role = input.role.unwrap_or(Role::Reader);

    let result = sqlx::query(
        "INSERT INTO users (name, email, hashed_password, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(&email)
    .bind(&hashed)
    .bind(role)
    .bind(Utc::now())
    .execute(&state.pool)
    .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&state.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

// ============================
// PUT /admin/users/:id/role
// ============================
async fn admin_update_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    Json(input): Json<UpdateRole>,
) -> Result<impl IntoResponse> {
    let admin = extract_admin_user(&state, &headers).await?;

    // Prevent self-demotion
    if admin.id == user_id && input.role != Role::Admin {
        return Err(Error::validation("Cannot remove your own admin role"));
    }

    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(input.role)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User not found"));
    }

    let updated_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;

    tracing::info!(user_id, role = input.role.as_str(), "user role updated");
    Ok(Json(UserResponse::from(updated_user)))
}

// ============================
// DELETE /admin/users/:id
// ============================
async fn admin_delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let admin = extract_admin_user(&state, &headers).await?;

    if admin.id == user_id {
        return Err(Error::validation("Cannot delete your own account"));
    }

    // Their posts and comments cascade; replies by others under those
    // comments become orphans and drop out of every nested view.
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound("User not found"));
    }

    tracing::info!(user_id, "user deleted");
    Ok(Json(serde_json::json!({"message": "User deleted successfully"})))
}
