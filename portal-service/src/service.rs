use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::Json,
    routing::{get, post, put},
};
use portal_core::{
    AdminDashboard, Claim, ClaimSortKey, ClaimStatus, Client, ClientDashboard, ClientSortKey,
    ClientStatus, ContractStatus, Document, DocumentCategory, DocumentSortKey, ExpirationScanJob,
    Insurance, InsuranceSortKey, NewClaim, NewDocument, NewInsurance, NewSupportTicket,
    Notification, PortalError, PortalStore, Reports, ScheduledJob, Scheduler, Settings,
    SupportResponse, SupportTicket, TicketSortKey, TicketStatus,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::models::{ListParams, NotificationsResponse, StatusUpdateRequest, TicketResponseRequest};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn portal_error(e: PortalError) -> ApiError {
    match &e {
        PortalError::NotFound { id, .. } => {
            warn!(error = %e, "Lookup failed");
            not_found_error(&e.to_string(), id)
        }
        _ => internal_error("Portal operation failed", &e.to_string()),
    }
}

/// Unwrap a JSON body, turning axum's rejection into a 400 with a JSON body
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected request body");
        bad_request_error("Invalid request body", &rejection.body_text())
    })
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query.map(|Query(value)| value).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected query string");
        bad_request_error("Invalid query string", &rejection.body_text())
    })
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PortalStore>,
}

impl AppState {
    pub fn new(store: Arc<PortalStore>) -> Self {
        Self { store }
    }
}

/// Start the expiration scanner against the store. The returned handle owns the task.
pub fn start_expiration_scanner(
    store: Arc<PortalStore>,
    config: &ServiceConfig,
) -> portal_core::Result<ScheduledJob> {
    let scheduler = Scheduler::new(config.scan_interval)?;
    let changes = store.policy_changes();
    Ok(scheduler.spawn(Arc::new(ExpirationScanJob::new(store)), changes))
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn build_router(app_state: AppState) -> Router {
    let client = Router::new()
        .route("/dashboard", get(client_dashboard))
        .route("/claims", get(list_claims).post(submit_claim))
        .route("/insurances", get(list_insurances).post(submit_insurance))
        .route("/support/tickets", get(list_tickets).post(submit_ticket))
        .route("/documents", get(list_documents).post(add_document))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_notification_read));

    let admin = Router::new()
        .route("/dashboard", get(admin_dashboard))
        .route("/claims", get(list_claims))
        .route("/claims/{id}/status", put(update_claim_status))
        .route("/contracts", get(list_insurances))
        .route("/contracts/{id}/status", put(update_contract_status))
        .route("/support/tickets", get(list_tickets))
        .route("/support/tickets/{id}/status", put(update_ticket_status))
        .route("/support/tickets/{id}/responses", post(respond_to_ticket))
        .route("/clients", get(list_clients))
        .route("/reports", get(reports))
        .route("/settings", get(get_settings).put(update_settings));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(client)
        .nest("/admin", admin)
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Insurance Portal Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /dashboard": "Client dashboard",
            "GET|POST /claims": "Track or declare claims",
            "GET|POST /insurances": "List policies or subscribe",
            "GET|POST /support/tickets": "List or open support tickets",
            "GET|POST /documents": "List or register documents",
            "GET /notifications": "Notification center",
            "POST /notifications/{id}/read": "Mark a notification as read",
            "GET /admin/dashboard": "Admin counters",
            "GET /admin/claims": "Claims management",
            "PUT /admin/claims/{id}/status": "Change a claim status",
            "GET /admin/contracts": "Contracts management",
            "PUT /admin/contracts/{id}/status": "Change a contract status",
            "PUT /admin/support/tickets/{id}/status": "Change a ticket status",
            "POST /admin/support/tickets/{id}/responses": "Answer a ticket",
            "GET /admin/clients": "Clients derived from contracts",
            "GET /admin/reports": "Statistics",
            "GET|PUT /admin/settings": "Portal settings",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn client_dashboard(State(state): State<AppState>) -> Json<ClientDashboard> {
    Json(state.store.client_dashboard().await)
}

async fn list_claims(
    State(state): State<AppState>,
    query: Result<Query<ListParams<ClaimStatus, ClaimSortKey>>, QueryRejection>,
) -> ApiResult<Vec<Claim>> {
    let params = query_params(query)?;
    Ok(Json(state.store.claims(&params.into_query()).await))
}

async fn submit_claim(
    State(state): State<AppState>,
    payload: Result<Json<NewClaim>, JsonRejection>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    let request = json_body(payload)?;
    info!(claim_type = %request.kind, "Declaring claim");
    Ok((StatusCode::CREATED, Json(state.store.submit_claim(request).await)))
}

async fn list_insurances(
    State(state): State<AppState>,
    query: Result<Query<ListParams<ContractStatus, InsuranceSortKey>>, QueryRejection>,
) -> ApiResult<Vec<Insurance>> {
    let params = query_params(query)?;
    Ok(Json(state.store.insurances(&params.into_query()).await))
}

async fn submit_insurance(
    State(state): State<AppState>,
    payload: Result<Json<NewInsurance>, JsonRejection>,
) -> Result<(StatusCode, Json<Insurance>), ApiError> {
    let request = json_body(payload)?;
    info!(insurance_type = %request.kind, "Subscribing");
    Ok((
        StatusCode::CREATED,
        Json(state.store.submit_insurance(request).await),
    ))
}

async fn list_tickets(
    State(state): State<AppState>,
    query: Result<Query<ListParams<TicketStatus, TicketSortKey>>, QueryRejection>,
) -> ApiResult<Vec<SupportTicket>> {
    let params = query_params(query)?;
    Ok(Json(state.store.tickets(&params.into_query()).await))
}

async fn submit_ticket(
    State(state): State<AppState>,
    payload: Result<Json<NewSupportTicket>, JsonRejection>,
) -> Result<(StatusCode, Json<SupportTicket>), ApiError> {
    let request = json_body(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(state.store.submit_support_ticket(request).await),
    ))
}

async fn list_documents(
    State(state): State<AppState>,
    query: Result<Query<ListParams<DocumentCategory, DocumentSortKey>>, QueryRejection>,
) -> ApiResult<Vec<Document>> {
    let params = query_params(query)?;
    Ok(Json(state.store.documents(&params.into_query()).await))
}

async fn add_document(
    State(state): State<AppState>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let request = json_body(payload)?;
    Ok((StatusCode::CREATED, Json(state.store.add_document(request).await)))
}

async fn list_notifications(State(state): State<AppState>) -> Json<NotificationsResponse> {
    let notifications = state.store.notifications().await;
    Json(NotificationsResponse {
        unread_count: notifications.iter().filter(|n| !n.read).count(),
        notifications,
    })
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    state
        .store
        .mark_notification_read(&id)
        .await
        .map(Json)
        .map_err(portal_error)
}

async fn admin_dashboard(State(state): State<AppState>) -> Json<AdminDashboard> {
    Json(state.store.admin_dashboard().await)
}

async fn update_claim_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest<ClaimStatus>>, JsonRejection>,
) -> ApiResult<Claim> {
    let request = json_body(payload)?;
    info!(claim_id = %id, status = %request.status, "Updating claim status");
    state
        .store
        .update_claim_status(&id, request.status)
        .await
        .map(Json)
        .map_err(portal_error)
}

async fn update_contract_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest<ContractStatus>>, JsonRejection>,
) -> ApiResult<Insurance> {
    let request = json_body(payload)?;
    info!(insurance_id = %id, status = %request.status, "Updating contract status");
    state
        .store
        .update_insurance_status(&id, request.status)
        .await
        .map(Json)
        .map_err(portal_error)
}

async fn update_ticket_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest<TicketStatus>>, JsonRejection>,
) -> ApiResult<SupportTicket> {
    let request = json_body(payload)?;
    state
        .store
        .update_ticket_status(&id, request.status)
        .await
        .map(Json)
        .map_err(portal_error)
}

async fn respond_to_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TicketResponseRequest>, JsonRejection>,
) -> ApiResult<SupportResponse> {
    let request = json_body(payload)?;
    state
        .store
        .respond_to_ticket(&id, request.message, request.is_agent.unwrap_or(true))
        .await
        .map(Json)
        .map_err(portal_error)
}

async fn list_clients(
    State(state): State<AppState>,
    query: Result<Query<ListParams<ClientStatus, ClientSortKey>>, QueryRejection>,
) -> ApiResult<Vec<Client>> {
    let params = query_params(query)?;
    Ok(Json(state.store.clients(&params.into_query()).await))
}

async fn reports(State(state): State<AppState>) -> Json<Reports> {
    Json(state.store.reports().await)
}

async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.store.settings().await)
}

async fn update_settings(
    State(state): State<AppState>,
    payload: Result<Json<Settings>, JsonRejection>,
) -> ApiResult<Settings> {
    let settings = json_body(payload)?;
    Ok(Json(state.store.update_settings(settings).await))
}
