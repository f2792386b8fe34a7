//! Upload handlers

use crate::config::AppState;
use crate::error::{Error, Result};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::Redirect,
};
use bytes::Bytes;
use tracing::{error, info};

/// POST /upload
///
/// Expects a multipart form with the image in the `image` field and
/// redirects to the stored file.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Redirect> {
    info!("POST /upload");

    let mut image: Option<(Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {}", e);
        Error::validation("Malformed upload")
    })? {
        if field.name() == Some("image") {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field.bytes().await.map_err(|e| {
                error!("Failed to read file data: {}", e);
                Error::validation("Malformed upload")
            })?;
            image = Some((filename, data));
        }
    }

    let (filename, data) = image.ok_or_else(|| Error::validation("No file part"))?;
    let stored = state.uploads.save(filename.as_deref(), data).await?;

    Ok(Redirect::to(&format!("/uploaded/{}", stored)))
}

/// GET /uploaded/:filename
pub async fn get_upload(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Result<(HeaderMap, Bytes)> {
    info!("GET /uploaded/{}", filename);

    let (data, content_type) = state.uploads.open(&filename).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    Ok((headers, data))
}
