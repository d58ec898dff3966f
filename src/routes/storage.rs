//! Storage gateway endpoints
//!
//! - `POST /storage/createBucket` - create a bucket (`name`)
//! - `POST /storage/upload` - store multipart field `file`, returns the object name
//! - `GET /storage/preview` - stream inline, thumbnail images when `width` and `height` are given
//! - `GET /storage/download` - stream as an attachment
//! - `POST /storage/delete` - remove an object

use std::io;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::TryStreamExt;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use super::extract::Params;
use crate::models::{AppState, CreateBucketParams, ObjectParams, PreviewParams};
use crate::storage::{ObjectStream, StorageError, UploadedFile};
use crate::types::{AppError, AppResult, DOWNLOAD_ERROR, FILE_READ_ERROR};
use crate::utils::filename::{Disposition, DispositionError, DisplayName, BINARY_CONTENT_TYPE};
use crate::utils::thumbnail::{self, ThumbnailError};

pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.upload.max_bytes;

    Router::new()
        .route("/storage/createBucket", post(create_bucket))
        .route(
            "/storage/upload",
            post(upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/storage/preview", get(preview))
        .route("/storage/download", get(download))
        .route("/storage/delete", post(delete_object))
        .with_state(state)
}

/// Failures while producing a preview. All of them reach the client as
/// [`AppError::FileRead`].
#[derive(Debug, thiserror::Error)]
enum StreamError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Header(#[from] DispositionError),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error("thumbnail task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
}

/// Body that streams the object and releases it when the body is dropped.
/// Read errors are logged and replaced by `message`.
fn stream_body(stream: ObjectStream, message: &'static str) -> Body {
    let object = stream.name().to_string();
    let chunks = ReaderStream::new(stream).map_err(move |e| {
        error!(object = %object, error = %e, "Object stream failed mid-response");
        io::Error::other(message)
    });
    Body::from_stream(chunks)
}

/// POST /storage/createBucket
async fn create_bucket(
    State(state): State<AppState>,
    Params(params): Params<CreateBucketParams>,
) -> AppResult<Json<bool>> {
    if params.name.is_empty() {
        return Err(AppError::InvalidRequest("bucket name must not be empty".to_string()));
    }
    info!(bucket = %params.name, "Create bucket request received");

    let created = state.store.create_bucket(&params.name).await?;
    Ok(Json(created))
}

/// POST /storage/upload
async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<String> {
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        let mut uploaded = UploadedFile::new(file_name, data);
        uploaded.content_type = content_type;
        file = Some(uploaded);
        break;
    }

    let file = file.ok_or_else(|| {
        AppError::InvalidRequest("multipart field 'file' is required".to_string())
    })?;
    info!(
        file_name = %file.file_name,
        size = file.data.len(),
        "Upload request received"
    );

    let object_name = state.store.put_object(state.bucket(), file).await?;
    info!(object = %object_name, "Upload stored");
    Ok(object_name)
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidRequest(e.body_text())
    }
}

/// GET /storage/preview
async fn preview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(params): Params<PreviewParams>,
) -> AppResult<Response> {
    info!(
        object = %params.object_name,
        width = ?params.width,
        height = ?params.height,
        "Preview request received"
    );

    render_preview(&state, &params, user_agent(&headers))
        .await
        .map_err(|e| {
            warn!(object = %params.object_name, error = %e, "Preview failed");
            AppError::FileRead
        })
}

async fn render_preview(
    state: &AppState,
    params: &PreviewParams,
    user_agent: Option<&str>,
) -> Result<Response, StreamError> {
    let stream = state.store.get_object(state.bucket(), &params.object_name).await?;

    let display = DisplayName::for_agent(&params.object_name, user_agent);
    let disposition = display.content_disposition(Disposition::Inline)?;
    let content_type = HeaderValue::from_static(display.preview_content_type());

    let body = match params.thumbnail_size() {
        Some((width, height)) if display.is_image() => {
            let source = stream.read_all().await?;
            let rendered =
                tokio::task::spawn_blocking(move || thumbnail::render(&source, width, height))
                    .await??;
            Body::from(rendered)
        }
        _ => stream_body(stream, FILE_READ_ERROR),
    };

    Ok((
        [(CONTENT_DISPOSITION, disposition), (CONTENT_TYPE, content_type)],
        body,
    )
        .into_response())
}

/// GET /storage/download
async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Params(params): Params<ObjectParams>,
) -> AppResult<Response> {
    info!(object = %params.object_name, "Download request received");

    let stream = state
        .store
        .get_object(state.bucket(), &params.object_name)
        .await?;

    let display = DisplayName::for_agent(&params.object_name, user_agent(&headers));
    let disposition = display
        .content_disposition(Disposition::Attachment)
        .map_err(|e| {
            warn!(object = %params.object_name, error = %e, "Download failed");
            AppError::Download
        })?;

    Ok((
        [
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_TYPE, HeaderValue::from_static(BINARY_CONTENT_TYPE)),
        ],
        stream_body(stream, DOWNLOAD_ERROR),
    )
        .into_response())
}

/// POST /storage/delete
async fn delete_object(
    State(state): State<AppState>,
    Params(params): Params<ObjectParams>,
) -> AppResult<StatusCode> {
    info!(object = %params.object_name, "Delete request received");

    state
        .store
        .remove_object(state.bucket(), &params.object_name)
        .await?;
    Ok(StatusCode::OK)
}
