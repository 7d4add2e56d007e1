//! Application state.

use std::sync::Arc;

use tokio::sync::Semaphore;

use signpose_media::{AnimationPipeline, MediaResult, PipelineConfig};

use crate::cache::ArtifactCache;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<AnimationPipeline>,
    pub cache: Arc<ArtifactCache>,
    /// Bounds concurrent renders.
    pub render_permits: Arc<Semaphore>,
}

impl AppState {
    /// Load the pipeline from configuration.
    pub fn new(config: ApiConfig, pipeline_config: &PipelineConfig) -> MediaResult<Self> {
        let pipeline = AnimationPipeline::from_config(pipeline_config)?;
        Ok(Self::from_parts(config, pipeline))
    }

    pub fn from_parts(config: ApiConfig, pipeline: AnimationPipeline) -> Self {
        let cache = ArtifactCache::new(&config.output_dir);
        let permits = Semaphore::new(config.max_concurrent_renders.max(1));
        Self {
            config,
            pipeline: Arc::new(pipeline),
            cache: Arc::new(cache),
            render_permits: Arc::new(permits),
        }
    }
}
