//! Structured per-request logging.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Request logger carrying a request ID and the words being animated.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    words: String,
}

impl RequestLogger {
    /// Create a logger with a fresh request ID.
    pub fn new(words: &[String]) -> Self {
        Self::with_id(&Uuid::new_v4().to_string(), words)
    }

    pub fn with_id(request_id: &str, words: &[String]) -> Self {
        Self {
            request_id: request_id.to_string(),
            words: words.join(" "),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            words = %self.words,
            "Animation started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            words = %self.words,
            "Animation progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            words = %self.words,
            "Animation warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            words = %self.words,
            "Animation error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            words = %self.words,
            "Animation completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Span for work done on behalf of this request.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "animation",
            request_id = %self.request_id,
            words = %self.words
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_differ() {
        let words = vec!["hello".to_string(), "world".to_string()];
        let a = RequestLogger::new(&words);
        let b = RequestLogger::new(&words);
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_with_id() {
        let logger = RequestLogger::with_id("req-1", &["hi".to_string()]);
        assert_eq!(logger.request_id(), "req-1");
        logger.log_start("test");
        logger.log_completion("test");
    }
}
