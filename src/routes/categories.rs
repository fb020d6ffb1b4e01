use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};

use crate::AppState;
use crate::error::{Error, Result};
use crate::models::{Category, CreateCategory, UpdateCategory};
use crate::routes::admin::extract_admin_user;
use crate::slug::slugify;

pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{category_id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
        .fetch_all(&state.pool)
        .await?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateCategory>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let name = input.name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::validation("Category name is required"));
    }

    let result = sqlx::query(
        "INSERT INTO categories (name, slug, description, cover_image) VALUES (?, ?, ?, ?)",
    )
    .bind(name)
    .bind(&slug)
    .bind(&input.description)
    .bind(&input.cover_image)
    .execute(&state.pool)
    .await?;

    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&state.pool)
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn find_category(pool: &sqlx::SqlitePool, category_id: i64) -> Result<Category> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("Category not found"))
}

async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse> {
    Ok(Json(find_category(&state.pool, category_id).await?))
}

async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(category_id): Path<i64>,
    Json(input): Json<UpdateCategory>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;
    let existing = find_category(&state.pool, category_id).await?;

    let name = input.name.as_deref().map(str::trim).unwrap_or(&existing.name);
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::validation("Category name is required"));
    }

    sqlx::query(
        "UPDATE categories SET name = ?, slug = ?, description = ?, cover_image = ? WHERE id = ?",
    )
    .bind(name)
    .bind(&slug)
    .bind(input.description.as_deref().or(existing.description.as_deref()))
    .bind(input.cover_image.as_deref().or(existing.cover_image.as_deref()))
    .bind(category_id)
    .execute(&state.pool)
    .await?;

    tracing::info!(category_id, slug = %slug, "category updated");
    Ok(Json(find_category(&state.pool, category_id).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(category_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(category_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Category not found"));
    }

    Ok(Json(serde_json::json!({"message": "Category deleted successfully"})))
}
