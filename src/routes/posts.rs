use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::extractors::JsonBody;
use crate::posts::{Post, PostInput};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

async fn list_posts(State(state): State<AppState>) -> Json<Vec<Post>> {
    Json(state.posts.list().await)
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.get(&id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<PostInput>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.create(input).await?))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<PostInput>,
) -> AppResult<Json<Post>> {
    Ok(Json(state.posts.update(&id, input).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    state.posts.delete(&id).await?;
    Ok(Json(json!({ "message": "Post deleted" })))
}
