use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::error;

use chipper_core::contracts::{CreatePostRequest, PublicationEvent};
use chipper_core::error::ChipperError;
use chipper_core::traits::{ContentStore, NotificationQueue, TargetKind};
use infrastructure::content_store::SqliteContentStore;
use infrastructure::notification_queue::SqliteNotificationQueue;
use shared::health::HealthMonitor;

use crate::service::FavoriteService;

pub struct AppState {
    pub favorites: Arc<FavoriteService>,
    pub store: Arc<SqliteContentStore>,
    pub queue: Arc<SqliteNotificationQueue>,
    pub health: Arc<Mutex<HealthMonitor>>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/posts", post(create_post_handler))
        .route("/api/favorites", get(list_favorites_handler))
        .route(
            "/api/favorites/posts/:post_id",
            post(favorite_post_handler).delete(unfavorite_post_handler),
        )
        .route(
            "/api/favorites/users/:user_id",
            post(favorite_user_handler).delete(unfavorite_user_handler),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Actor identity arrives from the upstream auth layer as a header.
fn actor_id(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Unauthenticated." })),
            )
                .into_response()
        })
}

fn error_response(e: ChipperError) -> Response {
    let (status, message) = match &e {
        ChipperError::SelfTarget { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "You cannot favorite yourself.")
        }
        ChipperError::AlreadyFavorited { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "Already favorited.")
        }
        ChipperError::FavoriteNotFound { .. } => {
            (StatusCode::NOT_FOUND, "Favorite does not exist.")
        }
        ChipperError::TargetMissing { .. } => (StatusCode::NOT_FOUND, "Target does not exist."),
        _ => {
            error!("Request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
        }
    };

    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// --- Health ---

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let status = state.health.lock().await.check();
    Json(status).into_response()
}

// --- Posts ---

async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreatePostRequest>,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let post = match state.store.create_post(&actor, &payload.title, &payload.body).await {
        Ok(post) => post,
        Err(e) => return error_response(e),
    };

    // The post row is committed; hand the fan-out to the queue. A queue
    // hiccup must not degrade the publish response.
    let event = PublicationEvent {
        author_id: post.user_id.clone(),
        post_id: post.id.clone(),
        post_title: post.title.clone(),
        post_summary: post.body.clone(),
    };
    if let Err(e) = state.queue.enqueue(&event).await {
        error!("Failed to enqueue publication event for post {}: {}", post.id, e);
    }

    (StatusCode::CREATED, Json(post)).into_response()
}

// --- Favorites ---

async fn list_favorites_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match state.favorites.list_favorites(&actor).await {
        Ok(list) => Json(list).into_response(),
        Err(e) => error_response(e),
    }
}

async fn favorite_post_handler(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    // Route-binding parity: favoriting a vanished target is a 404
    match state.store.fetch_post(&post_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(ChipperError::TargetMissing {
                target_kind: TargetKind::Post.to_string(),
                target_id: post_id,
            })
        }
        Err(e) => return error_response(e),
    }

    match state.favorites.favorite(&actor, TargetKind::Post, &post_id).await {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(e),
    }
}

async fn unfavorite_post_handler(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match state.favorites.unfavorite(&actor, TargetKind::Post, &post_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn favorite_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match state.store.fetch_user(&user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(ChipperError::TargetMissing {
                target_kind: TargetKind::User.to_string(),
                target_id: user_id,
            })
        }
        Err(e) => return error_response(e),
    }

    match state.favorites.favorite(&actor, TargetKind::User, &user_id).await {
        Ok(_) => StatusCode::CREATED.into_response(),
        Err(e) => error_response(e),
    }
}

async fn unfavorite_user_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_id(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match state.favorites.unfavorite(&actor, TargetKind::User, &user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
