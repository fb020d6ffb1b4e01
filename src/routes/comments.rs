use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
};
use sqlx::SqlitePool;

use crate::AppState;
use crate::comment_tree::{
    MAX_REPLY_DEPTH, count_nodes, delete_subtree, depth_of, find_owning_post_id, nest,
};
use crate::db::comments::{self, NewComment};
use crate::error::{Error, Result};
use crate::models::{
    Comment, CommentNode, CommentQuery, CommentTreeResponse, CreateComment, CreateReply, SortOrder,
    User,
};
use crate::routes::admin::extract_admin_user;
use crate::routes::auth::extract_current_user;

pub fn comments_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_comments).post(create_comment))
        .route("/{comment_id}", delete(delete_comment))
        .route("/{comment_id}/replies", post(create_reply))
}

pub(crate) fn tree_response(tree: Vec<CommentNode>) -> CommentTreeResponse {
    let total = count_nodes(&tree);
    CommentTreeResponse {
        comments: tree,
        total,
    }
}

async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentQuery>,
) -> Result<impl IntoResponse> {
    let order = query.order.unwrap_or_default();
    let rows = match query.post_id {
        Some(post_id) => comments::find_by_post(&state.pool, post_id, order).await?,
        None => comments::find_all(&state.pool, order).await?,
    };

    let tree = nest(&rows);
    tracing::debug!(rows = rows.len(), roots = tree.len(), "comment tree built");
    Ok(Json(tree_response(tree)))
}

pub(crate) async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse> {
    ensure_post_exists(&state.pool, post_id).await?;
    let rows = comments::find_by_post(&state.pool, post_id, SortOrder::Asc).await?;
    Ok(Json(tree_response(nest(&rows))))
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateComment>,
) -> Result<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let content = required_content(&input.content)?;

    if let Some(author_id) = input.author_id {
        if author_id != current_user.id {
            return Err(Error::Forbidden("Cannot comment on behalf of another user"));
        }
    }

    let post_id = match (input.post_id, input.parent_comment_id) {
        (claimed, Some(parent_comment_id)) => {
            let owning_post_id = resolve_reply_post(&state.pool, parent_comment_id).await?;
            if claimed.is_some_and(|post_id| post_id != owning_post_id) {
                return Err(Error::validation(
                    "Parent comment does not belong to this post",
                ));
            }
            owning_post_id
        }
        (Some(post_id), None) => {
            ensure_post_exists(&state.pool, post_id).await?;
            post_id
        }
        (None, None) => {
            return Err(Error::validation("postId or parentCommentId is required"));
        }
    };

    let comment = insert(
        &state.pool,
        &current_user,
        post_id,
        input.parent_comment_id,
        content,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn create_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(parent_comment_id): Path<i64>,
    Json(input): Json<CreateReply>,
) -> Result<impl IntoResponse> {
    let current_user = extract_current_user(&state, &headers).await?;
    let content = required_content(&input.content)?;
    let post_id = resolve_reply_post(&state.pool, parent_comment_id).await?;

    let comment = insert(
        &state.pool,
        &current_user,
        post_id,
        Some(parent_comment_id),
        content,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let admin = extract_admin_user(&state, &headers).await?;

    let deleted = delete_subtree(&state.pool, comment_id).await?;
    tracing::info!(
        admin_id = admin.id,
        comment_id,
        removed = deleted.len(),
        "comment subtree deleted"
    );

    Ok(Json(serde_json::json!({
        "message": "Comment deleted successfully",
        "deleted": deleted,
    })))
}

fn required_content(raw: &str) -> Result<&str> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(Error::validation("Comment content is required"));
    }
    Ok(content)
}

/// Finds the post a reply belongs to by locating its parent in that post's forest.
/// Parents cut off from their root are not found, so they cannot be replied to,
/// and a thread stops growing once it is [`MAX_REPLY_DEPTH`] replies deep.
async fn resolve_reply_post(pool: &SqlitePool, parent_comment_id: i64) -> Result<i64> {
    let parent = comments::find_by_id(pool, parent_comment_id)
        .await?
        .ok_or(Error::NotFound("Parent comment not found"))?;

    let rows = comments::find_by_post(pool, parent.post_id, SortOrder::Asc).await?;
    let forest = nest(&rows);

    let depth = depth_of(&forest, parent_comment_id).ok_or(Error::NotFound("Parent comment not found"))?;
    if depth >= MAX_REPLY_DEPTH {
        return Err(Error::validation(format!(
            "Replies cannot be nested more than {MAX_REPLY_DEPTH} levels deep"
        )));
    }

    find_owning_post_id(&forest, parent_comment_id).ok_or(Error::NotFound("Parent comment not found"))
}

async fn insert(
    pool: &SqlitePool,
    author: &User,
    post_id: i64,
    parent_comment_id: Option<i64>,
    content: &str,
) -> Result<Comment> {
    let comment = comments::create(
        pool,
        NewComment {
            post_id,
            author_id: author.id,
            content,
            parent_comment_id,
        },
    )
    .await?;
    tracing::info!(
        comment_id = comment.id,
        post_id,
        author_id = author.id,
        "comment created"
    );
    Ok(comment)
}

pub(crate) async fn ensure_post_exists(pool: &SqlitePool, post_id: i64) -> Result<()> {
    sqlx::query_as::<_, (i64,)>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound("Post not found"))?;
    Ok(())
}
