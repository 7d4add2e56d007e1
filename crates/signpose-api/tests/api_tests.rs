use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::RgbImage;
use ndarray::Array2;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use signpose_api::{create_router, ApiConfig, AppState};
use signpose_media::{
    AnimationPipeline, BodyMesh, BodyModel, BodyModelInput, HandPoseProcessor, InMemoryPoseSource,
    MediaError, MediaResult, OutputMode, PoseEvaluator, RenderContext, SoftwareRasterizer,
    VideoEncoder,
};
use signpose_models::{PoseSequence, POSE_DIM, RIGHT_HAND};

/// A flat triangle in front of the camera; rejects non-finite hands.
struct TriangleModel {
    faces: Array2<u32>,
}

impl BodyModel for TriangleModel {
    fn evaluate(&self, input: &BodyModelInput) -> MediaResult<BodyMesh> {
        if input
            .left_hand_pose
            .iter()
            .chain(&input.right_hand_pose)
            .any(|v| !v.is_finite())
        {
            return Err(MediaError::model_evaluation("non-finite hand"));
        }
        Ok(BodyMesh {
            vertices: Array2::from_shape_vec(
                (3, 3),
                vec![-0.5, -0.6, 0.0, 0.5, -0.6, 0.0, 0.0, 0.3, 0.0],
            )
            .unwrap(),
            joints: Array2::zeros((55, 3)),
        })
    }

    fn faces(&self) -> &Array2<u32> {
        &self.faces
    }
}

/// Writes one line per frame and counts invocations.
struct CountingEncoder {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingEncoder {
    fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl VideoEncoder for CountingEncoder {
    async fn encode(&self, frames: &[RgbImage], fps: u32, output: &Path) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let listing: String = frames.iter().map(|_| format!("frame@{}\n", fps)).collect();
        tokio::fs::write(output, listing).await?;
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    encoder: Arc<CountingEncoder>,
    output: TempDir,
}

fn sequence(frames: usize, value: f32) -> PoseSequence {
    PoseSequence::from_rows(vec![vec![value; POSE_DIM]; frames]).unwrap()
}

fn sequence_with_nan() -> PoseSequence {
    let mut rows = vec![vec![0.1f32; POSE_DIM]; 8];
    rows[3][RIGHT_HAND.start + 7] = f32::NAN;
    PoseSequence::from_rows(rows).unwrap()
}

fn test_app(mode: fn() -> OutputMode) -> TestApp {
    test_app_with(mode, Duration::from_millis(20), |config| config)
}

fn test_app_with(
    mode: fn() -> OutputMode,
    encode_delay: Duration,
    configure: impl FnOnce(ApiConfig) -> ApiConfig,
) -> TestApp {
    let output = TempDir::new().unwrap();
    let source = InMemoryPoseSource::new()
        .with_word("hello", sequence(10, 0.0))
        .with_word("world", sequence(10, 0.05))
        .with_word("thanks", sequence_with_nan());

    let model = Arc::new(TriangleModel {
        faces: Array2::from_shape_vec((1, 3), vec![0, 1, 2]).unwrap(),
    });
    let evaluator = PoseEvaluator::new(model, HandPoseProcessor::default(), mode());
    let encoder = Arc::new(CountingEncoder::with_delay(encode_delay));
    let pipeline = AnimationPipeline::new(Arc::new(source), evaluator, encoder.clone());

    let config = configure(ApiConfig {
        output_dir: output.path().to_path_buf(),
        ..ApiConfig::default()
    });
    let state = AppState::from_parts(config, pipeline);
    let router = create_router(state.clone(), None);
    TestApp {
        router,
        state,
        encoder,
        output,
    }
}

fn rasterize() -> OutputMode {
    OutputMode::Rasterize(RenderContext::new(Arc::new(
        SoftwareRasterizer::new(32, 24).unwrap(),
    )))
}

fn vertices_only() -> OutputMode {
    OutputMode::VerticesOnly
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn post_animate(router: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/animate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = test_app(rasterize);
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_list_words() {
    let app = test_app(rasterize);
    let (status, body) = send(&app.router, get("/api/words")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["words"], json!(["hello", "thanks", "world"]));
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn test_animate_two_words() {
    let app = test_app(rasterize);
    let (status, body) = post_animate(&app.router, json!({"words": ["Hello", "world"]})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "/output/hello_world_asl.mp4");
    assert_eq!(body["frames"], 20);
    assert_eq!(body["fps"], 15);
    assert_eq!(body["cached"], false);

    let video = app.output.path().join("hello_world_asl.mp4");
    let listing = std::fs::read_to_string(video).unwrap();
    assert_eq!(listing.lines().count(), 20);

    let (status, served) = send(&app.router, get("/output/hello_world_asl.mp4")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(served).unwrap(), listing);
}

#[tokio::test]
async fn test_repeat_request_is_cached() {
    let app = test_app(rasterize);
    let request = json!({"words": ["hello", "world"]});

    let (_, first) = post_animate(&app.router, request.clone()).await;
    let (status, second) = post_animate(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(second["frames"], 20);
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_identical_requests_render_once() {
    let app = test_app(rasterize);
    let request = json!({"words": ["world", "hello"]});

    let (a, b) = tokio::join!(
        post_animate(&app.router, request.clone()),
        post_animate(&app.router, request.clone())
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_options_change_artifact() {
    let app = test_app(rasterize);
    let (_, plain) = post_animate(&app.router, json!({"words": ["hello", "world"]})).await;
    let (status, blended) = post_animate(
        &app.router,
        json!({"words": ["hello", "world"], "blend_width": 5, "fps": 30}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_ne!(plain["url"], blended["url"]);
    assert_eq!(blended["frames"], 15);
    assert_eq!(blended["fps"], 30);
    assert_eq!(blended["cached"], false);
}

#[tokio::test]
async fn test_unknown_word_is_404() {
    let app = test_app(rasterize);
    let (status, body) = post_animate(&app.router, json!({"words": ["hello", "zebra"]})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("zebra"));
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_requests_are_400() {
    let app = test_app(rasterize);

    let (status, _) = post_animate(&app.router, json!({"words": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_animate(&app.router, json!({"words": ["hello"], "fps": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_animate(&app.router, json!({"fps": 15})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_nan_in_dataset_still_renders() {
    let app = test_app(rasterize);
    let (status, body) = post_animate(&app.router, json!({"words": ["thanks"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frames"], 8);
    assert_eq!(body["neutralized_frames"], 0);
}

#[tokio::test]
async fn test_vertices_only_returns_raw_output() {
    let app = test_app(vertices_only);
    let (status, body) = post_animate(&app.router, json!({"words": ["hello", "world"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw"]["frame_index"], 0);
    assert_eq!(body["raw"]["vertices"].as_array().unwrap().len(), 3);
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let app = test_app(rasterize);
    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["X-Request-ID"], "abc-123");
}

#[tokio::test]
async fn test_timed_out_render_keeps_its_permit() {
    let app = test_app_with(rasterize, Duration::from_millis(400), |config| ApiConfig {
        max_concurrent_renders: 1,
        request_timeout: Duration::from_millis(50),
        ..config
    });
    let request = json!({"words": ["hello"]});

    let (status, _) = post_animate(&app.router, request.clone()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.state.render_permits.available_permits(), 0);

    let mut waited = Duration::ZERO;
    while app.state.render_permits.available_permits() == 0 && waited < Duration::from_secs(5) {
        tokio::time::sleep(Duration::from_millis(25)).await;
        waited += Duration::from_millis(25);
    }
    assert_eq!(app.state.render_permits.available_permits(), 1);

    // The abandoned render still published its artifact.
    let (status, body) = post_animate(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], true);
    assert_eq!(app.encoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_default_fps_comes_from_pipeline() {
    let app = test_app(rasterize);
    let (status, body) = post_animate(&app.router, json!({"words": ["hello"], "fps": 15})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "/output/hello_asl.mp4");

    // Omitted fps resolves to the same artifact.
    let (_, again) = post_animate(&app.router, json!({"words": ["hello"]})).await;
    assert_eq!(again["url"], "/output/hello_asl.mp4");
    assert_eq!(again["cached"], true);
}

#[tokio::test]
async fn test_output_serves_only_videos() {
    let app = test_app(rasterize);
    let (status, _) = post_animate(&app.router, json!({"words": ["hello"]})).await;
    assert_eq!(status, StatusCode::OK);
    std::fs::write(app.output.path().join(".partial-abc.mp4"), b"half").unwrap();

    let (status, _) = send(&app.router, get("/output/hello_asl.mp4")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app.router, get("/output/hello_asl.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app.router, get("/output/.partial-abc.mp4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
