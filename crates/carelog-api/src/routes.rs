use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use carelog_core::sync::{ApiEnvelope, Confirmation, PullResponse, PushRequest};

use crate::auth::{
    extract_bearer_token, AuthenticatedUser, TokenPair, TokenService, UserRegistry,
};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::sync_log::SyncLog;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    tokens: Arc<TokenService>,
    registry: Arc<UserRegistry>,
    sync_log: Arc<SyncLog>,
}

impl AppState {
    #[must_use]
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            tokens: Arc::new(TokenService::new(&config)),
            registry: Arc::new(UserRegistry::new(&config)),
            sync_log: Arc::new(SyncLog::new(config.pull_page_size)),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/sync", get(pull_changes).post(push_changes))
        .route("/auth/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public_routes = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.tokens.verify_access(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct UserBody {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    user: UserBody,
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state
        .registry
        .verify_credentials(&request.email, &request.password)?;
    let tokens = state.tokens.issue_pair(&user)?;
    tracing::info!(user = %user.user_id, "login");
    Ok(Json(SessionResponse {
        tokens,
        user: UserBody {
            id: user.user_id,
            email: Some(user.email),
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = state.tokens.verify_refresh(&request.refresh_token)?;
    let tokens = state.tokens.issue_pair(&user)?;
    tracing::debug!(user = %user.user_id, "token refresh");
    Ok(Json(SessionResponse {
        tokens,
        user: UserBody {
            id: user.user_id.clone(),
            email: Some(user.email),
        },
    }))
}

async fn logout(Extension(user): Extension<AuthenticatedUser>) -> Json<ApiEnvelope<()>> {
    // Tokens are stateless; logout is the client discarding its session.
    tracing::info!(user = %user.user_id, "logout");
    Json(ApiEnvelope {
        code: 0,
        message: "ok".to_string(),
        data: None,
    })
}

#[derive(Debug, Deserialize)]
struct PullQuery {
    #[serde(default)]
    since: i64,
}

async fn pull_changes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<PullQuery>,
) -> Json<PullResponse> {
    let response = state.sync_log.changes_since(&user.user_id, query.since);
    tracing::debug!(
        user = %user.user_id,
        since = query.since,
        count = response.changes.len(),
        has_more = response.has_more,
        "pull"
    );
    Json(response)
}

async fn push_changes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<PushRequest>,
) -> Result<Json<ApiEnvelope<Vec<Confirmation>>>, AppError> {
    if request.changes.len() > 10_000 {
        return Err(AppError::bad_request("too many changes in one push"));
    }

    let confirmations = state.sync_log.apply_changes(&user.user_id, &request.changes);
    tracing::info!(
        user = %user.user_id,
        pushed = request.changes.len(),
        confirmed = confirmations.len(),
        "push"
    );
    Ok(Json(ApiEnvelope {
        code: 0,
        message: "ok".to_string(),
        data: Some(confirmations),
    }))
}
