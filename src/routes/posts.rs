use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};

use crate::AppState;
use crate::error::{Error, Result};
use crate::featured::{featured_post, set_featured};
use crate::models::{
    Category, CreatePost, Post, PostListResponse, PostQuery, ReactRequest, Reaction,
    SearchQuery, SearchResponse, UpdatePost,
};
use crate::reactions::{react, reaction_counts};
use crate::routes::admin::extract_admin_user;
use crate::routes::auth::extract_current_user;
use crate::routes::comments::{ensure_post_exists, list_post_comments};
use crate::slug::slugify;

pub fn posts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/featured", get(get_featured))
        .route("/search", get(search_posts))
        .route("/post-details/{slug}", get(get_post_by_slug))
        .route(
            "/{post_id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/{post_id}/toggle-featured", patch(toggle_featured))
        .route("/{post_id}/reaction", post(react_to_post).get(get_reactions))
        .route("/{post_id}/like", patch(like_post))
        .route("/{post_id}/dislike", patch(dislike_post))
        .route("/{post_id}/comments", get(list_post_comments))
}

fn push_post_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &PostQuery) {
    if let Some(category) = &query.category {
        builder.push(" AND c.slug = ").push_bind(category.clone());
    }
    if let Some(featured) = query.featured {
        builder.push(" AND p.featured = ").push_bind(featured);
    }
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| Error::validation("Page is out of range"))?;

    let mut select = QueryBuilder::<Sqlite>::new(
        "SELECT p.* FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE 1 = 1",
    );
    push_post_filters(&mut select, &query);
    select
        .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
        .push_bind(per_page)
        .push(" OFFSET ")
        .push_bind(offset);
    let posts = select
        .build_query_as::<Post>()
        .fetch_all(&state.pool)
        .await?;

    let mut count = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE 1 = 1",
    );
    push_post_filters(&mut count, &query);
    let (total,): (i64,) = count.build_query_as().fetch_one(&state.pool).await?;

    Ok(Json(PostListResponse {
        posts,
        total,
        page,
        per_page,
    }))
}

async fn get_featured(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(featured_post(&state.pool).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(Error::NotFound("Post not found"))?;

    Ok(Json(post))
}

async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE slug = ?")
        .bind(&slug)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(Error::NotFound("Post not found"))?;

    Ok(Json(post))
}

/// Everything a search page needs in one call: posts newest first, optionally
/// matched against title and content, plus every category by name.
async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE 1 = 1");
    if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", term);
        select
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR content LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    select.push(" ORDER BY created_at DESC, id DESC");

    let posts = select
        .build_query_as::<Post>()
        .fetch_all(&state.pool)
        .await?;
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(SearchResponse { posts, categories }))
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreatePost>,
) -> Result<impl IntoResponse> {
    let admin = extract_admin_user(&state, &headers).await?;

    let title = input.title.trim();
    let content = input.content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(Error::validation("Title and content are required"));
    }

    let slug = slugify(title);
    if slug.is_empty() {
        return Err(Error::validation("Title must contain letters or digits"));
    }

    if let Some(category_id) = input.category_id {
        sqlx::query_as::<_, (i64,)>("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(Error::NotFound("Category not found"))?;
    }

    let result = sqlx::query(
        r#"INSERT INTO posts (title, slug, content, summary, cover_image, category_id, author_id, featured, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, FALSE, ?)"#,
    )
    .bind(title)
    .bind(&slug)
    .bind(content)
    .bind(&input.summary)
    .bind(&input.cover_image)
    .bind(input.category_id)
    .bind(admin.id)
    .bind(Utc::now())
    .execute(&state.pool)
    .await?;

    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&state.pool)
        .await?;

    tracing::info!(post_id = post.id, slug = %post.slug, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
    Json(input): Json<UpdatePost>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    let existing = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(Error::NotFound("Post not found"))?;

    let title = input.title.as_deref().map(str::trim).unwrap_or(&existing.title);
    let content = input.content.as_deref().map(str::trim).unwrap_or(&existing.content);
    if title.is_empty() || content.is_empty() {
        return Err(Error::validation("Title and content are required"));
    }

    let slug = slugify(title);
    if slug.is_empty() {
        return Err(Error::validation("Title must contain letters or digits"));
    }

    if let Some(category_id) = input.category_id {
        sqlx::query_as::<_, (i64,)>("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(Error::NotFound("Category not found"))?;
    }

    sqlx::query(
        r#"UPDATE posts
           SET title = ?, slug = ?, content = ?, summary = ?, cover_image = ?, category_id = ?, updated_at = ?
           WHERE id = ?"#,
    )
    .bind(title)
    .bind(&slug)
    .bind(content)
    .bind(input.summary.as_deref().or(existing.summary.as_deref()))
    .bind(input.cover_image.as_deref().or(existing.cover_image.as_deref()))
    .bind(input.category_id.or(existing.category_id))
    .bind(Utc::now())
    .bind(post_id)
    .execute(&state.pool)
    .await?;

    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(&state.pool)
        .await?;

    tracing::info!(post_id, slug = %post.slug, "post updated");
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;

    // Comments go with the post through the foreign key cascade.
    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Post not found"));
    }

    tracing::info!(post_id, "post deleted");
    Ok(Json(serde_json::json!({"message": "Post deleted successfully"})))
}

async fn toggle_featured(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let _admin = extract_admin_user(&state, &headers).await?;
    let featured = set_featured(&state.pool, post_id).await?;

    Ok(Json(serde_json::json!({
        "message": "Featured status updated",
        "featured": featured,
    })))
}

async fn react_to_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
    Json(input): Json<ReactRequest>,
) -> Result<impl IntoResponse> {
    let user = extract_current_user(&state, &headers).await?;
    let reaction = Reaction::parse(&input.action).ok_or_else(|| Error::validation("Invalid action"))?;

    Ok(Json(react(&state.pool, post_id, user.id, reaction).await?))
}

async fn get_reactions(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    ensure_post_exists(&state.pool, post_id).await?;
    Ok(Json(reaction_counts(&state.pool, post_id).await?))
}

async fn like_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let user = extract_current_user(&state, &headers).await?;
    Ok(Json(react(&state.pool, post_id, user.id, Reaction::Like).await?))
}

async fn dislike_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let user = extract_current_user(&state, &headers).await?;
    Ok(Json(react(&state.pool, post_id, user.id, Reaction::Dislike).await?))
}
