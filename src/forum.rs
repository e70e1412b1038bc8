//! Per-unit community forum.
//!
//! Every post belongs to exactly one unit and is only ever read or answered
//! through that unit. Callers resolve the unit from the authenticated
//! resident, never from request input.
use anyhow::{Context as _, Result as AnyResult};
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;

use crate::{
    db::Db,
    error::Error,
    metrics::{FORUM_POSTS, FORUM_REPLIES},
    models::{Author, ForumPost, ForumReply, Resident},
    validation::Validator,
    Result,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
    pub content: String,
}

/// A post together with its author's public name.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: ForumPost,
    pub author: Author,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyView {
    #[serde(flatten)]
    pub reply: ForumReply,
    pub author: Author,
}

#[derive(FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: ForumPost,
    author_first_name: String,
    author_last_name: String,
}

impl From<PostRow> for PostView {
    fn from(row: PostRow) -> Self {
        Self {
            author: Author {
                id: row.post.author_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
            },
            post: row.post,
        }
    }
}

#[derive(FromRow)]
struct ReplyRow {
    #[sqlx(flatten)]
    reply: ForumReply,
    author_first_name: String,
    author_last_name: String,
}

impl From<ReplyRow> for ReplyView {
    fn from(row: ReplyRow) -> Self {
        Self {
            author: Author {
                id: row.reply.author_id,
                first_name: row.author_first_name,
                last_name: row.author_last_name,
            },
            reply: row.reply,
        }
    }
}

fn author_of(resident: &Resident) -> Author {
    Author {
        id: resident.id,
        first_name: resident.first_name.clone(),
        last_name: resident.last_name.clone(),
    }
}

#[derive(Clone, Debug)]
pub struct Forum {
    db: Db,
}

impl Forum {
    pub const fn new(db: Db) -> Self {
        Self { db }
    }

    /// Active posts of `unit`, pinned first, then oldest first.
    pub async fn list_posts(&self, unit: i64) -> AnyResult<Vec<PostView>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT p.*, r.first_name AS author_first_name, r.last_name AS author_last_name
                FROM forum_posts p
                JOIN residents r ON r.id = p.author_id
                WHERE p.unit_id = ? AND p.is_active = 1
                ORDER BY p.is_pinned DESC, p.id
            "#,
        )
        .bind(unit)
        .fetch_all(&self.db)
        .await
        .context("failed to list forum posts")?;

        Ok(rows.into_iter().map(PostView::from).collect())
    }

    /// Post in the author's own unit.
    pub async fn create_post(&self, author: &Resident, input: NewPost) -> Result<PostView> {
        let title = input.title.trim();
        let content = input.content.trim();
        let mut v = Validator::new();
        v.min_len("title", title, 5, "Title must be at least 5 characters");
        v.max_len("title", title, 200, "Title cannot exceed 200 characters");
        v.min_len("content", content, 10, "Content must be at least 10 characters");
        v.max_len("content", content, 2000, "Content cannot exceed 2000 characters");
        v.finish()?;

        let now = Utc::now();
        let post = sqlx::query_as::<_, ForumPost>(
            r#"
            INSERT INTO forum_posts (title, content, author_id, unit_id, is_announcement,
                is_pinned, is_active, created_at, updated_at)
                VALUES (?, ?, ?, ?, 0, 0, 1, ?, ?)
                RETURNING *
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(author.id)
        .bind(author.unit_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .context("failed to insert forum post")?;

        counter!(FORUM_POSTS).increment(1);
        info!(post = post.id, unit = post.unit_id, "new forum post");
        Ok(PostView {
            post,
            author: author_of(author),
        })
    }

    /// An active post, provided it belongs to `unit`. Posts of other units are
    /// reported as missing.
    async fn post_in_unit(&self, post_id: i64, unit: i64) -> Result<ForumPost> {
        sqlx::query_as::<_, ForumPost>(
            "SELECT * FROM forum_posts WHERE id = ? AND unit_id = ? AND is_active = 1",
        )
        .bind(post_id)
        .bind(unit)
        .fetch_optional(&self.db)
        .await
        .context("failed to fetch forum post")?
        .ok_or_else(|| Error::not_found("Post"))
    }

    /// Active replies to a post of `unit`, oldest first.
    pub async fn list_replies(&self, post_id: i64, unit: i64) -> Result<Vec<ReplyView>> {
        let post = self.post_in_unit(post_id, unit).await?;
        let rows = sqlx::query_as::<_, ReplyRow>(
            r#"
            SELECT f.*, r.first_name AS author_first_name, r.last_name AS author_last_name
                FROM forum_replies f
                JOIN residents r ON r.id = f.author_id
                WHERE f.post_id = ? AND f.is_active = 1
                ORDER BY f.id
            "#,
        )
        .bind(post.id)
        .fetch_all(&self.db)
        .await
        .context("failed to list forum replies")?;

        Ok(rows.into_iter().map(ReplyView::from).collect())
    }

    /// Reply to a post in the author's own unit.
    pub async fn create_reply(
        &self,
        author: &Resident,
        post_id: i64,
        input: NewReply,
    ) -> Result<ReplyView> {
        let content = input.content.trim();
        let mut v = Validator::new();
        v.min_len("content", content, 1, "Reply cannot be empty");
        v.max_len("content", content, 1000, "Reply cannot exceed 1000 characters");
        v.finish()?;

        let post = self.post_in_unit(post_id, author.unit_id).await?;
        let now = Utc::now();
        let reply = sqlx::query_as::<_, ForumReply>(
            r#"
            INSERT INTO forum_replies (content, author_id, post_id, is_active, created_at,
                updated_at)
                VALUES (?, ?, ?, 1, ?, ?)
                RETURNING *
            "#,
        )
        .bind(content)
        .bind(author.id)
        .bind(post.id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await
        .context("failed to insert forum reply")?;

        counter!(FORUM_REPLIES).increment(1);
        Ok(ReplyView {
            reply,
            author: author_of(author),
        })
    }
}
