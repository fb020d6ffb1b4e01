use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::{Comment, SortOrder};

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, parent_comment_id, created_at";

fn order_clause(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ORDER BY created_at ASC, id ASC",
        SortOrder::Desc => "ORDER BY created_at DESC, id DESC",
    }
}

pub async fn find_all(pool: &SqlitePool, order: SortOrder) -> Result<Vec<Comment>, sqlx::Error> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments {}", order_clause(order));
    sqlx::query_as::<_, Comment>(&sql).fetch_all(pool).await
}

pub async fn find_by_post(
    pool: &SqlitePool,
    post_id: i64,
    order: SortOrder,
) -> Result<Vec<Comment>, sqlx::Error> {
    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = ? {}",
        order_clause(order)
    );
    sqlx::query_as::<_, Comment>(&sql)
        .bind(post_id)
        .fetch_all(pool)
        .await
}

/// Direct replies of `comment_id`, oldest first.
pub async fn find_children(pool: &SqlitePool, comment_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE parent_comment_id = ? ORDER BY id ASC"
    );
    sqlx::query_as::<_, Comment>(&sql)
        .bind(comment_id)
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, comment_id: i64) -> Result<Option<Comment>, sqlx::Error> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");
    sqlx::query_as::<_, Comment>(&sql)
        .bind(comment_id)
        .fetch_optional(pool)
        .await
}

#[derive(Debug, Clone)]
pub struct NewComment<'a> {
    pub post_id: i64,
    pub author_id: i64,
    pub content: &'a str,
    pub parent_comment_id: Option<i64>,
}

pub async fn create(pool: &SqlitePool, new: NewComment<'_>) -> Result<Comment, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO comments (post_id, author_id, content, parent_comment_id, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new.post_id)
    .bind(new.author_id)
    .bind(new.content)
    .bind(new.parent_comment_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?");
    sqlx::query_as::<_, Comment>(&sql)
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await
}

/// Returns whether a row was removed. Deleting an unknown id is not an error.
pub async fn delete_by_id(pool: &SqlitePool, comment_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    #[tokio::test]
    async fn create_then_query_by_post_and_parent() {
        let pool = memory_pool().await;
        let author = seed_user(&pool, "reader", "reader").await;
        let first = seed_post(&pool, author, "first").await;
        let second = seed_post(&pool, author, "second").await;

        let root = create(
            &pool,
            NewComment {
                post_id: first,
                author_id: author,
                content: "hello",
                parent_comment_id: None,
            },
        )
        .await
        .unwrap();
        let reply = create(
            &pool,
            NewComment {
                post_id: first,
                author_id: author,
                content: "hi back",
                parent_comment_id: Some(root.id),
            },
        )
        .await
        .unwrap();
        create(
            &pool,
            NewComment {
                post_id: second,
                author_id: author,
                content: "elsewhere",
                parent_comment_id: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(reply.parent_comment_id, Some(root.id));
        assert_eq!(find_by_post(&pool, first, SortOrder::Asc).await.unwrap().len(), 2);
        assert_eq!(find_all(&pool, SortOrder::Asc).await.unwrap().len(), 3);

        let children = find_children(&pool, root.id).await.unwrap();
        assert_eq!(children.iter().map(|c| c.id).collect::<Vec<_>>(), vec![reply.id]);

        let newest_first = find_by_post(&pool, first, SortOrder::Desc).await.unwrap();
        assert_eq!(newest_first[0].id, reply.id);
    }

    #[tokio::test]
    async fn delete_by_id_is_idempotent() {
        let pool = memory_pool().await;
        let author = seed_user(&pool, "reader", "reader").await;
        let post = seed_post(&pool, author, "post").await;
        let comment = create(
            &pool,
            NewComment {
                post_id: post,
                author_id: author,
                content: "bye",
                parent_comment_id: None,
            },
        )
        .await
        .unwrap();

        assert!(delete_by_id(&pool, comment.id).await.unwrap());
        assert!(!delete_by_id(&pool, comment.id).await.unwrap());
        assert!(find_by_id(&pool, comment.id).await.unwrap().is_none());
    }
}
