//! Request handlers for the audio test endpoints.

use crate::core::flow::FlowPlan;
use crate::domain::model::{content_type_for, AudioInput, AudioOperation, FlowReport};
use crate::domain::ports::{AudioProcessor, Storage};
use crate::server::AppState;
use crate::utils::error::{AudioError, ErrorCategory};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Header carrying where an uploaded result was saved.
pub const OUTPUT_PATH_HEADER: &str = "x-output-path";

impl IntoResponse for AudioError {
    fn into_response(self) -> Response {
        let category = self.category();
        let status = match category {
            ErrorCategory::Input => StatusCode::BAD_REQUEST,
            ErrorCategory::Resource => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("❌ Request failed: {} (Category: {:?})", self, category);
        } else {
            warn!("Request rejected: {}", self);
        }

        let body = json!({
            "error": self.user_friendly_message(),
            "category": format!("{:?}", category),
            "suggestion": self.recovery_suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn list_flows<P, S>(State(state): State<Arc<AppState<P, S>>>) -> Json<Vec<FlowPlan>>
where
    P: AudioProcessor + 'static,
    S: Storage + 'static,
{
    Json(state.plans.clone())
}

pub async fn run_flow<P, S>(
    State(state): State<Arc<AppState<P, S>>>,
    Path(name): Path<String>,
) -> Result<Json<FlowReport>, AudioError>
where
    P: AudioProcessor + 'static,
    S: Storage + 'static,
{
    let plan = state
        .plan(&name)
        .cloned()
        .ok_or_else(|| AudioError::UnknownFlow { name: name.clone() })?;

    let _guard = state.flow_lock.lock().await;
    let report = state.runner.run(&plan).await?;
    Ok(Json(report))
}

pub async fn merge_upload<P, S>(
    State(state): State<Arc<AppState<P, S>>>,
    multipart: Multipart,
) -> Result<Response, AudioError>
where
    P: AudioProcessor + 'static,
    S: Storage + 'static,
{
    process_upload(&state, multipart, AudioOperation::Merge).await
}

pub async fn mix_upload<P, S>(
    State(state): State<Arc<AppState<P, S>>>,
    multipart: Multipart,
) -> Result<Response, AudioError>
where
    P: AudioProcessor + 'static,
    S: Storage + 'static,
{
    process_upload(&state, multipart, AudioOperation::Mix).await
}

async fn process_upload<P, S>(
    state: &AppState<P, S>,
    mut multipart: Multipart,
    operation: AudioOperation,
) -> Result<Response, AudioError>
where
    P: AudioProcessor,
    S: Storage,
{
    let (first, second) = read_upload_pair(&mut multipart).await?;

    let extension = first.extension().unwrap_or_else(|| "mp3".to_string());
    let output = format!(
        "uploads/{}-{}.{}",
        operation.as_str(),
        Uuid::new_v4(),
        extension
    );

    let artifact = state
        .runner
        .processor()
        .apply(operation, &first, &second, &output)
        .await?;
    info!(
        "✅ {} of {} + {} saved to {} ({} bytes)",
        operation.as_str(),
        first.file_name,
        second.file_name,
        artifact.path,
        artifact.size_bytes
    );

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&extension))],
        artifact.data,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&artifact.path) {
        response.headers_mut().insert(OUTPUT_PATH_HEADER, value);
    }
    Ok(response)
}

/// `file1` 和 `file2` 兩個欄位，其他欄位忽略
async fn read_upload_pair(multipart: &mut Multipart) -> Result<(AudioInput, AudioInput), AudioError> {
    let mut first = None;
    let mut second = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            "file1" => &mut first,
            "file2" => &mut second,
            _ => {
                tracing::debug!("Ignoring multipart field '{}'", name);
                continue;
            }
        };

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.mp3", name));
        let data = field.bytes().await.map_err(upload_error)?;
        *slot = Some(AudioInput::new(file_name, data));
    }

    match (first, second) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => Err(AudioError::UploadError {
            message: "multipart body must contain file1 and file2".to_string(),
        }),
    }
}

fn upload_error(e: MultipartError) -> AudioError {
    AudioError::UploadError {
        message: e.body_text(),
    }
}
