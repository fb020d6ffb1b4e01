use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{Error, Result};
use crate::models::{Reaction, ReactionCounts, ReactionSummary};

/// Applies `reaction` from `user_id` to `post_id`.
///
/// Sending the reaction the user already has withdraws it; sending the other
/// one replaces it. Returns the post's counts after the change.
pub async fn react(
    pool: &SqlitePool,
    post_id: i64,
    user_id: i64,
    reaction: Reaction,
) -> Result<ReactionSummary> {
    let mut tx = pool.begin().await?;

    sqlx::query_as::<_, (i64,)>("SELECT id FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound("Post not found"))?;

    let current: Option<(Reaction,)> =
        sqlx::query_as("SELECT reaction FROM post_reactions WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

    let now = if current.map(|(r,)| r) == Some(reaction) {
        sqlx::query("DELETE FROM post_reactions WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        None
    } else {
        sqlx::query(
            r#"INSERT INTO post_reactions (post_id, user_id, reaction, created_at) VALUES (?, ?, ?, ?)
               ON CONFLICT(post_id, user_id) DO UPDATE SET reaction = excluded.reaction, created_at = excluded.created_at"#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(reaction)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        Some(reaction)
    };

    let counts = counts_in(&mut tx, post_id).await?;
    tx.commit().await?;

    tracing::debug!(post_id, user_id, ?now, "reaction applied");
    Ok(ReactionSummary {
        counts,
        user_liked: now == Some(Reaction::Like),
        user_disliked: now == Some(Reaction::Dislike),
    })
}

pub async fn reaction_counts(pool: &SqlitePool, post_id: i64) -> Result<ReactionCounts> {
    let mut tx = pool.begin().await?;
    let counts = counts_in(&mut tx, post_id).await?;
    tx.commit().await?;
    Ok(counts)
}

async fn counts_in(tx: &mut Transaction<'_, Sqlite>, post_id: i64) -> Result<ReactionCounts> {
    let (likes_count, dislikes_count): (i64, i64) = sqlx::query_as(
        r#"SELECT
               COALESCE(SUM(reaction = 'like'), 0),
               COALESCE(SUM(reaction = 'dislike'), 0)
           FROM post_reactions WHERE post_id = ?"#,
    )
    .bind(post_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(ReactionCounts {
        likes_count,
        dislikes_count,
    })
}
