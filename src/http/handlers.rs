use std::future::Future;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainRecord, TlsState};
use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub domains: usize,
    pub tls_active: usize,
    pub tls_failed: usize,
    pub operations_in_flight: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    pub purge: Option<bool>,
}

/// Run a domain operation on its own task so it completes even if the
/// client goes away.
async fn detached<T, E, F>(fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(e) => {
            tracing::error!(error = %e, "Domain operation task failed");
            Err(ApiError::internal("domain operation aborted"))
        }
    }
}

pub async fn healthz() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let records = state.service.list_domains();
    let count = |s: TlsState| records.iter().filter(|r| r.tls_state == s).count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        domains: records.len(),
        tls_active: count(TlsState::Active),
        tls_failed: count(TlsState::Failed),
        operations_in_flight: state.service.operations_in_flight(),
    })
}

pub async fn list_domains(State(state): State<AppState>) -> Json<Vec<DomainRecord>> {
    Json(state.service.list_domains())
}

pub async fn get_domain(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DomainRecord>, ApiError> {
    Ok(Json(state.service.get_domain(&name)?))
}

pub async fn create_domain(
    State(state): State<AppState>,
    Json(body): Json<CreateDomainRequest>,
) -> Result<(StatusCode, Json<DomainRecord>), ApiError> {
    let service = state.service.clone();
    let record = detached(async move { service.create_domain(&body.name).await }).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn delete_domain(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let service = state.service.clone();
    detached(async move { service.delete_domain(&name, params.purge).await }).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn enable_tls(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DomainRecord>, ApiError> {
    let service = state.service.clone();
    let record = detached(async move { service.enable_tls(&name).await }).await?;
    Ok(Json(record))
}
