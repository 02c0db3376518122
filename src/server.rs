//! HTTP surface for a browser frontend.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::export::{self, ExportError, PDF_FILE_NAME};
use crate::form::SheetForm;
use crate::pdf;
use crate::pipeline::GenerationError;
use crate::product::{Language, ProductSheet};
use crate::service::{ServiceError, SheetService};
use crate::vault::VaultError;

pub const USER_HEADER: &str = "x-user-id";

pub fn router(service: Arc<SheetService>, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/api/sheets", get(list_sheets).post(create_sheet))
        .route("/api/sheets/{id}", get(get_sheet).delete(delete_sheet))
        .route("/api/sheets/{id}/export.json", get(export_json))
        .route("/api/sheets/{id}/export.pdf", get(export_pdf))
        .route("/api/export.json", post(export_sheet_json))
        .route("/api/export.pdf", post(export_sheet_pdf))
        .with_state(service)
        .layer(CorsLayer::permissive());

    match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    }
}

fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub struct ApiError(Response);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        let response = match err {
            ServiceError::Form(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
            ServiceError::Busy => json_error(StatusCode::CONFLICT, "generation_in_progress", message),
            ServiceError::Unauthenticated => json_error(StatusCode::UNAUTHORIZED, "unauthenticated", message),
            ServiceError::Generation(e) => match e {
                GenerationError::InvalidTopic => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
                GenerationError::Transport(_) => json_error(StatusCode::BAD_GATEWAY, "model_unreachable", message),
                GenerationError::Auth { .. } => json_error(StatusCode::BAD_GATEWAY, "model_auth", message),
                GenerationError::Quota(_) => json_error(StatusCode::TOO_MANY_REQUESTS, "model_quota", message),
                GenerationError::Endpoint { .. } => json_error(StatusCode::BAD_GATEWAY, "model_error", message),
                GenerationError::Schema(_) => {
                    json_error(StatusCode::UNPROCESSABLE_ENTITY, "schema_violation", message)
                }
            },
            ServiceError::Store(VaultError::NotFound) => json_error(StatusCode::NOT_FOUND, "not_found", message),
            ServiceError::Store(VaultError::InvalidUser(_)) => {
                json_error(StatusCode::BAD_REQUEST, "invalid_user", message)
            }
            ServiceError::Store(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message),
        };
        Self(response)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        Self(json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_error", err.to_string()))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_sheet(
    State(service): State<Arc<SheetService>>,
    headers: HeaderMap,
    payload: Result<Json<SheetForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(form) = payload?;
    let outcome = service.generate(&form, user_id(&headers).as_deref()).await?;
    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

async fn list_sheets(State(service): State<Arc<SheetService>>, headers: HeaderMap) -> Result<Response, ApiError> {
    let records = service.saved(user_id(&headers).as_deref())?;
    Ok(Json(records).into_response())
}

async fn get_sheet(
    State(service): State<Arc<SheetService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = service.record(user_id(&headers).as_deref(), &id)?;
    Ok(Json(record).into_response())
}

async fn delete_sheet(
    State(service): State<Arc<SheetService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    service.remove(user_id(&headers).as_deref(), &id)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Optional `?language=xx` on PDF exports; picks a translation when present.
#[derive(Deserialize, Debug, Default)]
struct PdfQuery {
    language: Option<Language>,
}

fn json_attachment(sheet: &ProductSheet) -> Result<Response, ApiError> {
    let body = export::to_json(sheet)?;
    Ok(attachment(
        "application/json",
        &export::json_file_name(Utc::now()),
        body.into_bytes(),
    ))
}

async fn pdf_attachment(sheet: ProductSheet, language: Option<Language>) -> Result<Response, ApiError> {
    let sheet = match language {
        Some(language) => ProductSheet::new(sheet.in_language(language).clone()),
        None => sheet,
    };
    let bytes = tokio::task::spawn_blocking(move || pdf::render(&sheet))
        .await
        .map_err(|e| ExportError::Pdf(e.to_string()))??;
    Ok(attachment("application/pdf", PDF_FILE_NAME, bytes))
}

async fn export_json(
    State(service): State<Arc<SheetService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = service.record(user_id(&headers).as_deref(), &id)?;
    json_attachment(&record.sheet())
}

async fn export_pdf(
    State(service): State<Arc<SheetService>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    query: Result<Query<PdfQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let record = service.record(user_id(&headers).as_deref(), &id)?;
    pdf_attachment(record.sheet(), query.language).await
}

/// Exports a sheet sent by the client. Covers sheets that were never saved:
/// anonymous generations and generations whose save failed.
async fn export_sheet_json(payload: Result<Json<ProductSheet>, JsonRejection>) -> Result<Response, ApiError> {
    let Json(sheet) = payload?;
    json_attachment(&sheet)
}

async fn export_sheet_pdf(
    query: Result<Query<PdfQuery>, QueryRejection>,
    payload: Result<Json<ProductSheet>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let Json(sheet) = payload?;
    pdf_attachment(sheet, query.language).await
}
