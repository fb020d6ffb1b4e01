use async_recursion::async_recursion;
use sqlx::SqlitePool;

use crate::db::comments;
use crate::error::Result;

/// Removes `comment_id` and every reply below it, straight against the store.
///
/// Children are looked up and removed depth-first before their parent, so the
/// returned ids are ordered children before parents. Nothing is wrapped in a
/// transaction: a failure part way leaves the already removed rows gone, and
/// calling this again on the same id finishes the job. An id that no longer
/// exists yields an empty list.
#[async_recursion]
pub async fn delete_subtree(pool: &SqlitePool, comment_id: i64) -> Result<Vec<i64>> {
    let mut removed = Vec::new();

    for child in comments::find_children(pool, comment_id).await? {
        removed.extend(delete_subtree(pool, child.id).await?);
    }

    if comments::delete_by_id(pool, comment_id).await? {
        removed.push(comment_id);
    }

    Ok(removed)
}
