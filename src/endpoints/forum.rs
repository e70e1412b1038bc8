use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde::Deserialize;

use super::{Json, Path, Query};
use crate::{
    auth::AuthenticatedResident,
    forum::{Forum, NewPost, NewReply, PostView, ReplyView},
    policy::UnitScope,
    AppState, Result,
};

#[derive(Debug, Default, Deserialize)]
struct PostFilter {
    #[serde(rename = "barangayId")]
    unit_id: Option<i64>,
}

async fn list_posts(
    user: AuthenticatedResident,
    State(forum): State<Forum>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<PostView>>> {
    let unit = UnitScope::for_resident(&user.resident, filter.unit_id)?;
    Ok(Json(forum.list_posts(unit).await?))
}

async fn create_post(
    user: AuthenticatedResident,
    State(forum): State<Forum>,
    Json(input): Json<NewPost>,
) -> Result<(StatusCode, Json<PostView>)> {
    let post = forum.create_post(&user.resident, input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_replies(
    user: AuthenticatedResident,
    State(forum): State<Forum>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<ReplyView>>> {
    Ok(Json(forum.list_replies(post_id, user.resident.unit_id).await?))
}

async fn create_reply(
    user: AuthenticatedResident,
    State(forum): State<Forum>,
    Path(post_id): Path<i64>,
    Json(input): Json<NewReply>,
) -> Result<(StatusCode, Json<ReplyView>)> {
    let reply = forum.create_reply(&user.resident, post_id, input).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

#[rustfmt::skip]
pub(super) fn routes() -> Router<AppState> {
    // RG /api/forum/posts
    // RP /api/forum/posts
    // RG /api/forum/posts/{id}/replies
    // RP /api/forum/posts/{id}/replies
    Router::new()
        .route("/forum/posts",                   get(list_posts).post(create_post))
        .route("/forum/posts/{post_id}/replies", get(list_replies).post(create_reply))
}
