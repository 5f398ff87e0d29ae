// src/handlers/uploads.rs

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::SessionContext,
};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "pdf"];

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "http://localhost:3000/uploads/0b9c2f1e-....jpg")]
    pub url: String,
}

/// Lower-cased extension when it is one we accept.
fn accepted_extension(filename: &str) -> Result<String, AppError> {
    let ext = FsPath::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AppError::Upload(format!("File '{filename}' has no extension.")))?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::Upload(format!(
            "Unsupported file type '{ext}'. Allowed: {}.",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    Ok(ext)
}

/// Stored names are `<uuid>.<ext>`; anything else is refused.
fn stored_path(upload_dir: &str, name: &str) -> Option<PathBuf> {
    let (stem, ext) = name.rsplit_once('.')?;
    Uuid::parse_str(stem).ok()?;
    if !ALLOWED_EXTENSIONS.contains(&ext) {
        return None;
    }
    Some(FsPath::new(upload_dir).join(name))
}

fn content_type(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

// POST /api/upload/screenshot
#[utoipa::path(
    post,
    path = "/api/upload/screenshot",
    tag = "Uploads",
    request_body(content_type = "multipart/form-data", description = "Single `file` field"),
    responses(
        (status = 201, description = "Stored; the URL is ready to attach to a payment", body = UploadResponse),
        (status = 400, description = "Missing, empty, oversized or unsupported file")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_screenshot(
    State(app_state): State<AppState>,
    session: SessionContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(format!("Invalid multipart request: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Upload("No filename provided.".into()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(format!("Could not read the file: {e}")))?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) = upload.ok_or_else(|| AppError::Upload("No 'file' field found.".into()))?;
    if data.is_empty() {
        return Err(AppError::Upload("Empty file provided.".into()).into());
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Upload(format!(
            "File too large. Maximum size is {}MB.",
            MAX_UPLOAD_BYTES / 1024 / 1024
        ))
        .into());
    }
    let ext = accepted_extension(&filename)?;

    let upload_dir = &app_state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    let stored_name = format!("{}.{ext}", Uuid::new_v4());
    tokio::fs::write(FsPath::new(upload_dir).join(&stored_name), &data)
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    tracing::info!(admin_id = %session.admin_id, file = %stored_name, size = data.len(), "screenshot uploaded");

    let url = format!("{}/uploads/{stored_name}", app_state.config.public_base_url);
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

// GET /uploads/{name}
pub async fn serve_upload(
    State(app_state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let path = stored_path(&app_state.config.upload_dir, &name).ok_or(AppError::NotFound("File"))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound("File").into()),
        Err(e) => return Err(AppError::InternalServerError(e.into()).into()),
    };

    Ok(([(header::CONTENT_TYPE, content_type(&name))], bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_checked_case_insensitively() {
        assert_eq!(accepted_extension("Receipt.JPG").unwrap(), "jpg");
        assert!(matches!(accepted_extension("notes.exe"), Err(AppError::Upload(_))));
        assert!(matches!(accepted_extension("no_extension"), Err(AppError::Upload(_))));
    }

    #[test]
    fn only_generated_names_are_served() {
        let name = format!("{}.png", Uuid::from_u128(9));
        assert_eq!(stored_path("/srv/uploads", &name), Some(PathBuf::from("/srv/uploads").join(&name)));
        assert_eq!(stored_path("/srv/uploads", "../secrets.png"), None);
        assert_eq!(stored_path("/srv/uploads", "passwd"), None);
        assert_eq!(content_type(&name), "image/png");
    }
}
