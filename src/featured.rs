use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::Post;

/// Toggles the featured flag of `post_id` and un-features every other post.
///
/// Runs as one transaction. A missing post aborts before anything is written,
/// so other posts keep their flags. Returns the post's new flag: toggling the
/// currently featured post leaves no post featured.
pub async fn set_featured(pool: &SqlitePool, post_id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let (current,): (bool,) = sqlx::query_as("SELECT featured FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("Post not found"))?;
    let featured = !current;

    // Clear first: the partial unique index rejects two featured rows at any point.
    sqlx::query("UPDATE posts SET featured = FALSE WHERE id <> ? AND featured = TRUE")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE posts SET featured = ?, updated_at = ? WHERE id = ?")
        .bind(featured)
        .bind(Utc::now())
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(post_id, featured, "featured flag toggled");
    Ok(featured)
}

pub async fn featured_post(pool: &SqlitePool) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE featured = TRUE LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(post)
}
