// HTTP handlers for upload, deletion and garbage collection
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::auth::Authorized;
use crate::app_state::AppState;
use crate::error::{AssetError, ValidationError};
use crate::service::ingest_service::{format_size, IncomingAsset, IngestService};

/// Multipart field carrying the uploaded file
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize)]
struct CollectRequest {
    #[serde(rename = "activeImages", default)]
    active_images: Option<Vec<String>>,
}

/// Socket peer address; forwarding headers are client-controlled and ignored
fn client_address(req: &HttpRequest) -> String {
    let client = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    log_mdc::insert("client", &client);
    client
}

/// `GET /healthz`
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

/// `POST /upload`
pub async fn upload_image(
    auth: Authorized,
    req: HttpRequest,
    mut payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AssetError> {
    let client = client_address(&req);
    info!("{} hit /upload", client);

    let incoming = read_image_field(&mut payload, &app_state.ingest_service).await?;

    let service = Arc::clone(&app_state.ingest_service);
    let grant = auth.into_grant();
    let metadata = web::block(move || service.upload(&grant, incoming)).await??;

    info!("{} uploaded {} with {}", client, metadata.image_name, format_size(metadata.size));
    Ok(HttpResponse::Created().json(serde_json::json!({ "data": metadata })))
}

/// `DELETE /images/{image_name}`
pub async fn delete_image(
    auth: Authorized,
    req: HttpRequest,
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AssetError> {
    let client = client_address(&req);
    let image_name = path.into_inner();

    let service = Arc::clone(&app_state.deletion_service);
    let grant = auth.into_grant();
    let name = image_name.clone();
    let outcome = web::block(move || service.delete(&grant, &name)).await??;

    info!("{} deleted {} ({:?})", client, image_name, outcome);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": 200,
        "message": outcome.message(),
    })))
}

/// `POST /garbage-collect`
pub async fn garbage_collect(
    auth: Authorized,
    req: HttpRequest,
    body: web::Bytes,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AssetError> {
    let client = client_address(&req);
    info!("{} hit /garbage-collect", client);

    let request: CollectRequest =
        serde_json::from_slice(&body).map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
    let active = request.active_images.unwrap_or_default();
    debug!("{} active images: {:?}", client, active);

    let collector = Arc::clone(&app_state.collector);
    let grant = auth.into_grant();
    let report = web::block(move || collector.collect(&grant, active)).await??;

    info!("{} garbage collected {} images", client, report.count());
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": 200,
        "message": report.message(),
        "removed": &report.removed,
        "count": report.count(),
    })))
}

/// Pull the `image` field out of the form, enforcing the size limit while
/// streaming so an oversized body is never fully buffered
async fn read_image_field(payload: &mut Multipart, ingest: &IngestService) -> Result<IncomingAsset, AssetError> {
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(malformed)?;

        if field.name() != Some(IMAGE_FIELD) {
            drain(&mut field).await?;
            continue;
        }

        let original_filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        // Reject a disallowed type before reading the body.
        ingest.check_extension(&original_filename)?;

        let mut content_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in field.headers() {
            if let Ok(value) = value.to_str() {
                content_headers
                    .entry(canonical_header_name(name.as_str()))
                    .or_default()
                    .push(value.to_string());
            }
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(malformed)?;
            ingest.check_size((data.len() + chunk.len()) as u64)?;
            data.extend_from_slice(&chunk);
        }

        debug!("Received {} ({} bytes)", original_filename, data.len());
        return Ok(IncomingAsset {
            original_filename,
            content_headers,
            data: data.freeze(),
        });
    }

    Err(ValidationError::MissingField(IMAGE_FIELD).into())
}

async fn drain(field: &mut Field) -> Result<(), AssetError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(malformed)?;
    }
    Ok(())
}

fn malformed(e: actix_multipart::MultipartError) -> AssetError {
    ValidationError::MalformedBody(e.to_string()).into()
}

/// `content-type` -> `Content-Type`
fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
