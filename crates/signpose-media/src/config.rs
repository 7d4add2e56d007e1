//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;

use signpose_models::{EncodingConfig, DEFAULT_FPS};

use crate::hand::{JointLimitTable, DEFAULT_SIGMA};
use crate::error::{MediaError, MediaResult};
use crate::render::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};

/// Whether frames are rendered or raw model output is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Render,
    Vertices,
}

impl FromStr for RenderMode {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "render" | "rasterize" => Ok(RenderMode::Render),
            "vertices" | "vertices_only" => Ok(RenderMode::Vertices),
            other => Err(MediaError::invalid_request(format!("unknown render mode: {}", other))),
        }
    }
}

/// Animation pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// SMPL-X model `.npz`
    pub model_path: PathBuf,
    /// Directory holding per-word pose records
    pub dataset_dir: PathBuf,
    /// Mapping JSON from record file name to gloss
    pub mapping_path: PathBuf,
    /// Optional JSON override for the joint limit table
    pub joint_limits_path: Option<PathBuf>,
    pub smoothing_sigma: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub default_fps: u32,
    pub render_mode: RenderMode,
    pub encoding: EncodingConfig,
    /// FFmpeg timeout in seconds
    pub encode_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/smplx/SMPLX_NEUTRAL.npz"),
            dataset_dir: PathBuf::from("dataset"),
            mapping_path: PathBuf::from("dataset/mapping.json"),
            joint_limits_path: None,
            smoothing_sigma: DEFAULT_SIGMA,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            default_fps: DEFAULT_FPS,
            render_mode: RenderMode::Render,
            encoding: EncodingConfig::default(),
            encode_timeout_secs: 300,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut encoding = defaults.encoding.clone();
        if let Some(crf) = env_parse("SIGNPOSE_CRF") {
            encoding = encoding.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("SIGNPOSE_PRESET") {
            encoding = encoding.with_preset(preset);
        }

        Self {
            model_path: std::env::var("SIGNPOSE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            dataset_dir: std::env::var("SIGNPOSE_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dataset_dir),
            mapping_path: std::env::var("SIGNPOSE_MAPPING_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.mapping_path),
            joint_limits_path: std::env::var("SIGNPOSE_JOINT_LIMITS_PATH").ok().map(PathBuf::from),
            smoothing_sigma: env_parse("SIGNPOSE_SMOOTHING_SIGMA").unwrap_or(defaults.smoothing_sigma),
            viewport_width: env_parse("SIGNPOSE_VIEWPORT_WIDTH").unwrap_or(defaults.viewport_width),
            viewport_height: env_parse("SIGNPOSE_VIEWPORT_HEIGHT").unwrap_or(defaults.viewport_height),
            default_fps: env_parse("SIGNPOSE_DEFAULT_FPS").unwrap_or(defaults.default_fps),
            render_mode: env_parse("SIGNPOSE_RENDER_MODE").unwrap_or(defaults.render_mode),
            encoding,
            encode_timeout_secs: env_parse("SIGNPOSE_ENCODE_TIMEOUT_SECS")
                .unwrap_or(defaults.encode_timeout_secs),
        }
    }

    /// Load the joint limit table, falling back to the built-in defaults.
    pub fn joint_limits(&self) -> MediaResult<JointLimitTable> {
        let Some(path) = &self.joint_limits_path else {
            return Ok(JointLimitTable::default());
        };
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.clone()));
        }
        let table: JointLimitTable = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        if !table.is_well_formed() {
            return Err(MediaError::invalid_request(format!(
                "joint limit table {} has an interval with min > max",
                path.display()
            )));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_fps, 15);
        assert_eq!((config.viewport_width, config.viewport_height), (640, 480));
        assert!((config.smoothing_sigma - 0.3).abs() < 1e-12);
        assert_eq!(config.render_mode, RenderMode::Render);
    }

    #[test]
    fn test_render_mode_parsing() {
        assert_eq!("vertices".parse::<RenderMode>().unwrap(), RenderMode::Vertices);
        assert_eq!(" Render ".parse::<RenderMode>().unwrap(), RenderMode::Render);
        assert!("opengl".parse::<RenderMode>().is_err());
    }

    #[test]
    fn test_joint_limits_default_and_override() {
        let config = PipelineConfig::default();
        assert!(config.joint_limits().unwrap().is_well_formed());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limits.json");
        std::fs::write(&path, r#"{"general_clamp": {"min": -1.0, "max": 1.0}}"#).unwrap();
        let config = PipelineConfig {
            joint_limits_path: Some(path),
            ..PipelineConfig::default()
        };
        let table = config.joint_limits().unwrap();
        assert_eq!(table.general_clamp().max, 1.0);

        let missing = PipelineConfig {
            joint_limits_path: Some(dir.path().join("none.json")),
            ..PipelineConfig::default()
        };
        assert!(matches!(missing.joint_limits(), Err(MediaError::FileNotFound(_))));
    }
}
