//! Animation handler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use validator::Validate;

use signpose_media::{AnimationOutcome, OutputMode};
use signpose_models::{AnimationRequest, RawModelOutput};

use crate::cache::ArtifactKey;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Metadata stored beside each cached video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub frames: usize,
    pub fps: u32,
    pub neutralized_frames: usize,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AnimateResponse {
    Video {
        url: String,
        frames: usize,
        fps: u32,
        neutralized_frames: usize,
        cached: bool,
    },
    Raw {
        raw: Box<RawModelOutput>,
    },
}

async fn acquire_render_permit(permits: Arc<Semaphore>) -> ApiResult<OwnedSemaphorePermit> {
    permits
        .acquire_owned()
        .await
        .map_err(|_| ApiError::Unavailable("render queue closed".to_string()))
}

/// `POST /api/animate`: render (or reuse) the video for an ordered word list.
///
/// Rendering runs in its own task holding the render permit and the cache
/// key lock. A request timeout stops the wait, not the render, so the permit
/// stays taken until the work is really done.
pub async fn animate(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<AnimationRequest>, JsonRejection>,
) -> ApiResult<Json<AnimateResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request.validate()?;

    let request_id = request_id.map(|Extension(RequestId(id))| id);
    let key = ArtifactKey::from_request(&request, state.pipeline.fps_for(&request));
    let timeout = state.config.request_timeout;

    if matches!(state.pipeline.evaluator().mode(), OutputMode::VerticesOnly) {
        let pipeline = state.pipeline.clone();
        let permits = state.render_permits.clone();
        let path = state.cache.path_for(&key);
        let task = tokio::spawn(async move {
            let _permit = acquire_render_permit(permits).await?;
            let outcome = pipeline
                .animate_with_id(&request, &path, request_id.as_deref())
                .await?;
            Ok::<_, ApiError>(outcome)
        });
        return match wait_for(task, timeout).await? {
            AnimationOutcome::Raw(raw) => Ok(Json(AnimateResponse::Raw { raw })),
            AnimationOutcome::Video { .. } => Err(ApiError::internal("expected raw output")),
        };
    }

    let pipeline = state.pipeline.clone();
    let permits = state.render_permits.clone();
    let compute = |path: PathBuf| async move {
        let _permit = acquire_render_permit(permits).await?;
        metrics::render_started();
        let outcome = pipeline
            .animate_with_id(&request, &path, request_id.as_deref())
            .await;
        metrics::render_finished();

        match outcome? {
            AnimationOutcome::Video {
                frame_count,
                fps,
                neutralized_frames,
                ..
            } => Ok(VideoMeta {
                frames: frame_count,
                fps,
                neutralized_frames,
            }),
            AnimationOutcome::Raw(_) => Err(ApiError::internal("expected a video")),
        }
    };

    let cache = state.cache.clone();
    let task = tokio::spawn(async move { cache.get_or_compute(&key, compute).await });
    let entry = wait_for(task, timeout).await?;

    info!(
        file = %entry.file_name,
        frames = entry.meta.frames,
        cached = entry.cached,
        "Animation ready"
    );

    Ok(Json(AnimateResponse::Video {
        url: format!("/output/{}", entry.file_name),
        frames: entry.meta.frames,
        fps: entry.meta.fps,
        neutralized_frames: entry.meta.neutralized_frames,
        cached: entry.cached,
    }))
}

/// Wait up to `timeout` for a render task. The task keeps running after a
/// timeout and publishes its artifact for later requests.
async fn wait_for<T>(task: JoinHandle<ApiResult<T>>, timeout: Duration) -> ApiResult<T> {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ApiError::internal(format!("render task failed: {}", e))),
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs_f64(), "Animation still rendering, giving up the wait");
            Err(ApiError::Unavailable("animation timed out".to_string()))
        }
    }
}
