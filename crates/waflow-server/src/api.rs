use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::AuthIdentity;
use crate::billing::{Billing, ChangePlanRequest};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::messaging::{
    CreateGroupRequest, Messaging, PageQuery, SendMediaRequest, SendTemplateRequest,
    SendTextRequest, WebhookRequest,
};
use crate::orchestrator::{CreateInstanceRequest, Orchestrator, UpdateInstanceRequest};
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::relay::EventRelay;
use crate::tenants::{Tenants, UpdateProfileRequest};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub messaging: Arc<Messaging>,
    pub billing: Arc<Billing>,
    pub tenants: Arc<Tenants>,
    pub relay: EventRelay,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/tenants", post(register_tenant))
        .route("/api/instances", get(list_instances).post(create_instance))
        .route(
            "/api/instances/:name",
            get(get_instance).put(update_instance).delete(delete_instance),
        )
        .route("/api/instances/:name/qr", get(instance_qr))
        .route("/api/messages/send-text", post(send_text))
        .route("/api/messages/send-media", post(send_media))
        .route("/api/messages/send-template", post(send_template))
        .route("/api/messages/:name/chats", get(find_chats))
        .route("/api/messages/:name/chat/:jid", get(find_messages))
        .route("/api/messages/:name/groups", get(find_groups).post(create_group))
        .route(
            "/api/webhooks/:name",
            post(set_webhook).get(get_webhook).delete(delete_webhook),
        )
        .route("/api/billing/plans", get(list_plans))
        .route(
            "/api/billing/subscription",
            get(get_subscription).put(change_plan),
        )
        .route("/api/user/profile", put(update_profile))
        .route("/api/user/stats", get(user_stats))
        .route("/api/events", get(events_ws))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

fn ok(data: impl serde::Serialize) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn ok_with_message(data: impl serde::Serialize, message: &str) -> Response {
    Json(json!({ "success": true, "message": message, "data": data })).into_response()
}

fn created(data: impl serde::Serialize, message: &str) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn register_tenant(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> Result<Response, ApiError> {
    let (user, was_created) = state.tenants.register(&identity).await?;
    if was_created {
        Ok(created(user, "Account registered"))
    } else {
        Ok(ok(user))
    }
}

async fn create_instance(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(req): Json<CreateInstanceRequest>,
) -> Result<Response, ApiError> {
    let instance = state
        .orchestrator
        .create_instance(identity.user_id, req)
        .await?;
    Ok(created(instance, "Instance created successfully"))
}

async fn list_instances(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> Result<Response, ApiError> {
    let instances = state.orchestrator.list_instances(identity.user_id).await?;
    Ok(ok(instances))
}

async fn get_instance(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let instance = state
        .orchestrator
        .get_instance(identity.user_id, &name)
        .await?;
    Ok(ok(instance))
}

/// Per-field results; any failed sub-update turns the whole response into
/// a 400 carrying the individual outcomes.
async fn update_instance(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
    Json(req): Json<UpdateInstanceRequest>,
) -> Result<Response, ApiError> {
    let report = state
        .orchestrator
        .update_instance(identity.user_id, &name, req)
        .await?;

    if report.all_succeeded() {
        return Ok(ok_with_message(
            report.results,
            "Instance updated successfully",
        ));
    }
    Ok((
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "error": "Some updates failed",
            "details": report.failed(),
        })),
    )
        .into_response())
}

async fn delete_instance(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    state
        .orchestrator
        .delete_instance(identity.user_id, &name)
        .await?;
    Ok(ok_with_message(json!(null), "Instance deleted successfully"))
}

async fn instance_qr(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let payload = state
        .orchestrator
        .pairing_code(identity.user_id, &name)
        .await?;
    Ok(ok(payload))
}

async fn send_text(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(req): Json<SendTextRequest>,
) -> Result<Response, ApiError> {
    let data = state.messaging.send_text(identity.user_id, req).await?;
    Ok(ok_with_message(data, "Message sent successfully"))
}

async fn send_media(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(req): Json<SendMediaRequest>,
) -> Result<Response, ApiError> {
    let data = state.messaging.send_media(identity.user_id, req).await?;
    Ok(ok_with_message(data, "Media sent successfully"))
}

async fn send_template(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(req): Json<SendTemplateRequest>,
) -> Result<Response, ApiError> {
    let data = state.messaging.send_template(identity.user_id, req).await?;
    Ok(ok_with_message(data, "Template sent successfully"))
}

async fn find_chats(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let data = state.messaging.chats(identity.user_id, &name, query).await?;
    Ok(ok(data))
}

async fn find_messages(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path((name, jid)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let data = state
        .messaging
        .messages(identity.user_id, &name, &jid, query)
        .await?;
    Ok(ok(data))
}

async fn find_groups(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.messaging.groups(identity.user_id, &name).await?;
    Ok(ok(data))
}

async fn create_group(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<Response, ApiError> {
    let data = state
        .messaging
        .create_group(identity.user_id, &name, req)
        .await?;
    Ok(created(data, "Group created successfully"))
}

async fn set_webhook(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
    Json(req): Json<WebhookRequest>,
) -> Result<Response, ApiError> {
    let data = state
        .messaging
        .set_webhook(identity.user_id, &name, req)
        .await?;
    Ok(ok_with_message(data, "Webhook configured successfully"))
}

async fn get_webhook(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let data = state.messaging.get_webhook(identity.user_id, &name).await?;
    Ok(ok(data))
}

async fn delete_webhook(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let data = state
        .messaging
        .delete_webhook(identity.user_id, &name)
        .await?;
    Ok(ok_with_message(data, "Webhook removed successfully"))
}

async fn list_plans(State(state): State<AppState>) -> Response {
    ok(state.billing.plans())
}

async fn get_subscription(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> Result<Response, ApiError> {
    let data = state.billing.subscription(identity.user_id).await?;
    Ok(ok(data))
}

async fn change_plan(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(req): Json<ChangePlanRequest>,
) -> Result<Response, ApiError> {
    let data = state.billing.change_plan(identity.user_id, req).await?;
    Ok(ok_with_message(data, "Subscription updated successfully"))
}

async fn update_profile(
    State(state): State<AppState>,
    identity: AuthIdentity,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Response, ApiError> {
    let user = state.tenants.update_profile(identity.user_id, req).await?;
    Ok(ok_with_message(user, "Profile updated successfully"))
}

async fn user_stats(
    State(state): State<AppState>,
    identity: AuthIdentity,
) -> Result<Response, ApiError> {
    let data = state.tenants.stats(identity.user_id).await?;
    Ok(ok(data))
}

// ---------------------------------------------------------------------------
// Live event stream
// ---------------------------------------------------------------------------

async fn events_ws(
    State(state): State<AppState>,
    identity: AuthIdentity,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| event_session(socket, state.relay, identity))
}

/// Forward the tenant's relay events over one websocket until either side
/// goes away.  A session lagging past the channel buffer just skips the
/// lost events.
async fn event_session(mut socket: WebSocket, relay: EventRelay, identity: AuthIdentity) {
    use tokio::sync::broadcast::error::RecvError;

    let mut rx = relay.subscribe(identity.user_id).await;
    info!(user = %identity.user_id, "event session opened");

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let Ok(payload) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(user = %identity.user_id, skipped, "event session lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Pings are answered by axum; other frames are ignored.
                Some(Ok(_)) => {}
            },
        }
    }

    info!(user = %identity.user_id, "event session closed");
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
