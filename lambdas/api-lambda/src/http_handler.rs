use cakewalk_atoms::catalog::{self, TagsInput, UploadMetadata, UploadRequest};
use cakewalk_shared::{auth, AppState};
use lambda_http::{
    http::{header::HeaderValue, Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;

fn with_cors_headers(mut resp: Response<Body>, allow_origin: &str) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(allow_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    resp
}

fn finalize_response(
    resp: Result<Response<Body>, Error>,
    allow_origin: &str,
) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(r, allow_origin))
}

/// Main Lambda handler - routes requests to the catalog
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = strip_api_prefix(event.uri().path());
    let allow_origin = state.config.cors_allow_origin.as_str();
    tracing::info!("🚀 Cakewalk API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == &Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, allow_origin));
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        // GET /health - configuration summary, no store access
        (&Method::GET, ["health"]) => health(&state),
        // GET /cakes - list the catalog
        (&Method::GET, ["cakes"]) => {
            catalog::list_catalog_handler(state.store.as_ref(), &state.list_options()).await
        }
        // POST /cakes - upload an image (requires auth)
        (&Method::POST, ["cakes"]) => {
            if let Err(e) = auth::authorize(event.headers(), &state.config.auth_secret, chrono::Utc::now()) {
                return finalize_response(auth::unauthorized(&e), allow_origin);
            }
            let upload = upload_request(&event);
            catalog::upload_image_handler(state.store.as_ref(), upload).await
        }
        // PUT /cakes/{id} - update image metadata (requires auth)
        (&Method::PUT, ["cakes", raw_id]) => {
            if let Err(e) = auth::authorize(event.headers(), &state.config.auth_secret, chrono::Utc::now()) {
                return finalize_response(auth::unauthorized(&e), allow_origin);
            }
            // Path segments arrive percent-encoded; keys are stored decoded.
            let image_id = match percent_decode_str(raw_id).decode_utf8() {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("⚠️ undecodable image id {}: {}", raw_id, e);
                    return finalize_response(bad_request("Invalid image id"), allow_origin);
                }
            };
            catalog::update_metadata_handler(
                state.store.as_ref(),
                state.guard.as_ref(),
                &image_id,
                event.body(),
            )
            .await
        }
        (_, ["health"]) | (_, ["cakes"]) | (_, ["cakes", _]) => method_not_allowed(),
        _ => {
            tracing::warn!("⚠️ No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    };

    finalize_response(resp, allow_origin)
}

/// The CloudFront distribution forwards `/api/*` unchanged.
fn strip_api_prefix(path: &str) -> &str {
    match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Raw image body; the image type comes from `Content-Type`, the rest from the query string.
fn upload_request(event: &Request) -> UploadRequest {
    let params = event.query_string_parameters_ref();
    let param = |name: &str| {
        params
            .and_then(|p| p.first(name))
            .map(|v| v.to_string())
    };

    let content_type = event
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    UploadRequest {
        filename: param("filename").unwrap_or_default(),
        content_type,
        body: event.body().to_vec(),
        metadata: UploadMetadata {
            title: param("title"),
            description: param("description"),
            category: param("category"),
            tags: param("tags").map(TagsInput::Text),
        },
    }
}

fn health(state: &AppState) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({
                "ok": true,
                "bucket": state.config.bucket,
                "region": state.config.region,
                "backend": state.config.backend.as_str(),
            })
            .to_string()
            .into(),
        )
        .map_err(Box::new)?)
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": false, "message": message})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": false, "message": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"success": false, "message": "Not found"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}
