//! Animation requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default output frame rate.
pub const DEFAULT_FPS: u32 = 15;

/// Normalize a gloss word for lookup: trimmed and lowercased.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// A request to animate an ordered list of gloss words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct AnimationRequest {
    /// Gloss words, played in order.
    #[validate(length(min = 1, max = 64, message = "at least one word is required"))]
    pub words: Vec<String>,

    /// Output frame rate; the service default when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 120))]
    pub fps: Option<u32>,

    /// Frames cross-faded between adjacent words (0 disables blending).
    #[serde(default)]
    #[validate(range(max = 120))]
    pub blend_width: usize,

    /// Mirror the signing (left-handed signer).
    #[serde(default)]
    pub mirror: bool,
}

impl AnimationRequest {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
            fps: None,
            blend_width: 0,
            mirror: false,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_blend_width(mut self, blend_width: usize) -> Self {
        self.blend_width = blend_width;
        self
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// The requested frame rate, or `default` when none was given.
    pub fn fps_or(&self, default: u32) -> u32 {
        self.fps.unwrap_or(default)
    }

    /// Words after normalization, in request order.
    pub fn normalized_words(&self) -> Vec<String> {
        self.words.iter().map(|w| normalize_word(w)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let request: AnimationRequest = serde_json::from_str(r#"{"words": ["April"]}"#).unwrap();
        assert_eq!(request.fps, None);
        assert_eq!(request.fps_or(DEFAULT_FPS), 15);
        assert_eq!(request.clone().with_fps(24).fps_or(DEFAULT_FPS), 24);
        assert_eq!(request.blend_width, 0);
        assert!(!request.mirror);
        assert_eq!(request.normalized_words(), vec!["april"]);
    }

    #[test]
    fn test_validation() {
        assert!(AnimationRequest::new(["hello"]).validate().is_ok());
        assert!(AnimationRequest::new(Vec::<String>::new()).validate().is_err());
        assert!(AnimationRequest::new(["hello"]).with_fps(0).validate().is_err());
    }

    #[test]
    fn test_schema_lists_fields() {
        let schema = schemars::schema_for!(AnimationRequest);
        let json = serde_json::to_value(&schema).unwrap();
        let properties = &json["properties"];
        for field in ["words", "fps", "blend_width", "mirror"] {
            assert!(properties.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(json["required"], serde_json::json!(["words"]));
    }
}
