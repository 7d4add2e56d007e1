//! Metric names and recording helpers for the animation pipeline.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_EVALUATED_TOTAL: &str = "signpose_frames_evaluated_total";
    pub const NONFINITE_SANITIZED_TOTAL: &str = "signpose_nonfinite_sanitized_total";
    pub const FRAME_RETRIES_TOTAL: &str = "signpose_frame_retries_total";
    pub const FRAME_FAILURES_TOTAL: &str = "signpose_frame_failures_total";
    pub const EVALUATION_DURATION_SECONDS: &str = "signpose_evaluation_duration_seconds";
    pub const ENCODE_DURATION_SECONDS: &str = "signpose_encode_duration_seconds";
    pub const ANIMATIONS_TOTAL: &str = "signpose_animations_total";
}

pub fn record_frames_evaluated(count: usize) {
    counter!(names::FRAMES_EVALUATED_TOTAL).increment(count as u64);
}

pub fn record_sanitized(hand: &'static str, entries: usize) {
    counter!(names::NONFINITE_SANITIZED_TOTAL, "hand" => hand).increment(entries as u64);
}

pub fn record_frame_retry() {
    counter!(names::FRAME_RETRIES_TOTAL).increment(1);
}

pub fn record_frame_failure() {
    counter!(names::FRAME_FAILURES_TOTAL).increment(1);
}

pub fn record_evaluation_duration(duration_secs: f64) {
    histogram!(names::EVALUATION_DURATION_SECONDS).record(duration_secs);
}

pub fn record_encode_duration(duration_secs: f64) {
    histogram!(names::ENCODE_DURATION_SECONDS).record(duration_secs);
}

/// Record a finished animation request by outcome (`video`, `raw`, `error`).
pub fn record_animation(outcome: &'static str) {
    counter!(names::ANIMATIONS_TOTAL, "outcome" => outcome).increment(1);
}
