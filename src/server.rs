//! Axum HTTP surface.
//!
//! Routes live under `/auth` and `/sales`. Every path except login and the
//! API description requires `Authorization: Bearer <token>`; the sales table
//! and the identity provider are injected through [`AppState`].

use std::{collections::HashMap, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Query, Request, State, rejection::JsonRejection, rejection::QueryRejection},
    http::header,
    middleware::{self, Next},
    response::Response,
    routing::{MethodRouter, get, post},
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    auth::{IdentityProvider, SignInError},
    dataset::{Row, SalesTable},
    error::{ApiError, ApiResult},
    filter::{self, DateRange, KeyColumn},
    openapi,
    stats::{self, SalesSummary},
};

/// Paths reachable without a bearer token.
pub const PUBLIC_PATHS: &[&str] = &["/auth/login", "/openapi.json"];

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub table: Arc<SalesTable>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(table: SalesTable, identity: impl IdentityProvider + 'static) -> Self {
        Self {
            table: Arc::new(table),
            identity: Arc::new(identity),
        }
    }
}

type Params = HashMap<String, String>;

/// Registers `handler` at `path` and at `path` without its trailing slash.
fn route_both(router: Router<AppState>, path: &str, handler: MethodRouter<AppState>) -> Router<AppState> {
    let trimmed = path.trim_end_matches('/');
    let router = router.route(path, handler.clone());
    if trimmed.is_empty() || trimmed == path {
        router
    } else {
        router.route(trimmed, handler)
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = [
        ("/auth/login", post(login)),
        ("/openapi.json", get(openapi_document)),
        ("/sales/employee/", get(sales_by_employee)),
        ("/sales/product/", get(sales_by_product)),
        ("/sales/store/", get(sales_by_store)),
        ("/sales/employee/total_avg/", get(totals_by_employee)),
        ("/sales/product/total_avg/", get(totals_by_product)),
        ("/sales/store/total_avg/", get(totals_by_store)),
        ("/sales/first_record/", get(first_record)),
    ];
    let router = routes
        .into_iter()
        .fold(Router::new(), |router, (path, handler)| {
            route_both(router, path, handler)
        });

    router
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl+C.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Binding {addr}"))?;
    info!(
        "Serving {} row(s) on http://{}",
        state.table.len(),
        listener.local_addr()?
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Middleware
// ============================================================================

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        "{method} {path} -> {} in {:.1}ms",
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

/// Rejects requests without a valid bearer token. Every failure mode
/// surfaces as the same 401.
async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)?;
    let claims = state.identity.verify(token).map_err(|err| {
        debug!("Rejected bearer token: {err}");
        ApiError::Unauthorized
    })?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = body.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;
    match state.identity.sign_in(&request.email, &request.password) {
        Ok(token) => Ok(Json(LoginResponse { token })),
        Err(SignInError::InvalidCredentials) => {
            Err(ApiError::LoginFailed(SignInError::InvalidCredentials.to_string()))
        }
        Err(SignInError::Internal(err)) => Err(ApiError::Internal(err)),
    }
}

/// GET /openapi.json
async fn openapi_document() -> Json<Value> {
    Json(openapi::document())
}

// ============================================================================
// Sales
// ============================================================================

fn query_params(query: Result<Query<Params>, QueryRejection>) -> ApiResult<Params> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))
}

fn required<'a>(params: &'a Params, name: &str) -> ApiResult<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ApiError::Unprocessable(format!("Missing required query parameter '{name}'")))
}

fn search(table: &SalesTable, column: KeyColumn, params: &Params) -> ApiResult<Vec<Row>> {
    let key = required(params, column.query_param())?;
    let start = required(params, "start_date")?;
    let end = required(params, "end_date")?;
    let range = DateRange::parse(start, end)?;

    let selection = filter::filter_by_key_and_range(table, column, key, &range);
    if selection.is_empty() {
        return Err(ApiError::not_found(format!(
            "No sales data found for the given {} and date range.",
            column.entity()
        )));
    }
    Ok(selection.rows().cloned().collect())
}

fn totals(table: &SalesTable, column: KeyColumn, params: &Params) -> ApiResult<SalesSummary> {
    let key = required(params, column.query_param())?;
    let selection = filter::filter_by_key(table, column, key);
    stats::summarize(&selection)
}

/// GET /sales/employee/
async fn sales_by_employee(
    State(state): State<AppState>,
    query: Result<Query<Params>, QueryRejection>,
) -> ApiResult<Json<Vec<Row>>> {
    search(&state.table, KeyColumn::Employee, &query_params(query)?).map(Json)
}

/// GET /sales/product/
async fn sales_by_product(
    State(state): State<AppState>,
    query: Result<Query<Params>, QueryRejection>,
) -> ApiResult<Json<Vec<Row>>> {
    search(&state.table, KeyColumn::Product, &query_params(query)?).map(Json)
}

/// GET /sales/store/
async fn sales_by_store(
    State(state): State<AppState>,
    query: Result<Query<Params>, QueryRejection>,
) -> ApiResult<Json<Vec<Row>>> {
    search(&state.table, KeyColumn::Store, &query_params(query)?).map(Json)
}

/// GET /sales/employee/total_avg/
async fn totals_by_employee(
    State(state): State<AppState>,
    query: Result<Query<Params>, QueryRejection>,
) -> ApiResult<Json<SalesSummary>> {
    totals(&state.table, KeyColumn::Employee, &query_params(query)?).map(Json)
}

/// GET /sales/product/total_avg/
async fn totals_by_product(
    State(state): State<AppState>,
    query: Result<Query<Params>, QueryRejection>,
) -> ApiResult<Json<SalesSummary>> {
    totals(&state.table, KeyColumn::Product, &query_params(query)?).map(Json)
}

/// GET /sales/store/total_avg/
async fn totals_by_store(
    State(state): State<AppState>,
    query: Result<Query<Params>, QueryRejection>,
) -> ApiResult<Json<SalesSummary>> {
    totals(&state.table, KeyColumn::Store, &query_params(query)?).map(Json)
}

/// GET /sales/first_record/
async fn first_record(State(state): State<AppState>) -> ApiResult<Json<Row>> {
    state
        .table
        .first()
        .map(|record| Json(record.row().clone()))
        .ok_or_else(|| ApiError::not_found("No data available."))
}
