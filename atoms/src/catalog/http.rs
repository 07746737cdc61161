use lambda_http::{http::StatusCode, Body, Error as LambdaError, Response};
use serde::Serialize;

use super::error::CatalogError;
use super::landing::LandingGuard;
use super::model::{MetadataPatch, StatusResponse, UploadRequest, UploadResponse};
use super::service::{create_image, list_catalog, update_metadata, ListOptions};
use crate::store::ObjectStore;

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, LambdaError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?)
}

fn failure(status: StatusCode, message: impl Into<String>) -> Result<Response<Body>, LambdaError> {
    json_response(
        status,
        &StatusResponse {
            success: false,
            message: message.into(),
        },
    )
}

/// Status and caller-safe message for a catalog error. Store details stay in the logs.
fn error_status(err: &CatalogError, fallback: &str) -> (StatusCode, String) {
    match err {
        CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "Image not found".to_string()),
        CatalogError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        CatalogError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, fallback.to_string()),
    }
}

/// HTTP Handler: GET /cakes
pub async fn list_catalog_handler(
    store: &dyn ObjectStore,
    opts: &ListOptions,
) -> Result<Response<Body>, LambdaError> {
    match list_catalog(store, opts).await {
        Ok(records) => json_response(StatusCode::OK, &records),
        Err(e) => {
            tracing::error!("❌ list_catalog_handler failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch cakes")
        }
    }
}

/// HTTP Handler: PUT /cakes/{id}
pub async fn update_metadata_handler(
    store: &dyn ObjectStore,
    guard: &dyn LandingGuard,
    image_id: &str,
    body: &[u8],
) -> Result<Response<Body>, LambdaError> {
    // Malformed bodies are rejected before any store call.
    let patch: MetadataPatch = match serde_json::from_slice(body) {
        Ok(patch) => patch,
        Err(e) => {
            tracing::warn!("⚠️ invalid metadata patch for {}: {}", image_id, e);
            return failure(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e));
        }
    };

    match update_metadata(store, guard, image_id, patch).await {
        Ok(outcome) => {
            if let Some(report) = outcome.sweep.filter(|r| !r.is_clean()) {
                tracing::warn!(
                    "⚠️ {} promoted with incomplete sweep: failed={} listed={}",
                    image_id,
                    report.failed,
                    report.listed
                );
            }
            json_response(
                StatusCode::OK,
                &StatusResponse {
                    success: true,
                    message: "Metadata updated successfully".to_string(),
                },
            )
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!("⚠️ update_metadata_handler rejected {}: {}", image_id, e);
            } else {
                tracing::error!("❌ update_metadata_handler failed for {}: {}", image_id, e);
            }
            let (status, message) = error_status(&e, "Failed to update metadata");
            failure(status, message)
        }
    }
}

/// HTTP Handler: POST /cakes
pub async fn upload_image_handler(
    store: &dyn ObjectStore,
    upload: UploadRequest,
) -> Result<Response<Body>, LambdaError> {
    tracing::info!(
        "📥 upload_image_handler: filename={}, content_type={}, bytes={}",
        upload.filename,
        upload.content_type,
        upload.body.len()
    );

    match create_image(store, upload).await {
        Ok(outcome) => {
            tracing::info!("✅ upload stored as {}", outcome.key);
            json_response(
                StatusCode::CREATED,
                &UploadResponse {
                    success: true,
                    message: "File uploaded successfully!".to_string(),
                    location: outcome.location,
                },
            )
        }
        Err(e) => {
            if e.is_client_error() {
                tracing::warn!("⚠️ upload rejected: {}", e);
            } else {
                tracing::error!("❌ upload_image_handler failed: {}", e);
            }
            let (status, message) = error_status(&e, "An internal server error occurred.");
            failure(status, message)
        }
    }
}
