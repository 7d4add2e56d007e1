//! Per-word sequence lookup and concatenation.

use std::sync::Arc;

use tracing::{debug, info};

use signpose_models::{PoseFrame, PoseSequence};

use crate::dataset::PoseSource;
use crate::error::{MediaError, MediaResult};

/// Builds one continuous pose sequence from an ordered word list.
#[derive(Clone)]
pub struct SequenceAssembler {
    source: Arc<dyn PoseSource>,
}

impl SequenceAssembler {
    pub fn new(source: Arc<dyn PoseSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn PoseSource> {
        &self.source
    }

    /// Resolve every word and concatenate the results.
    ///
    /// Any unknown word aborts the whole assembly. With `blend_width > 0`
    /// adjacent words are cross-faded (see [`blend_sequences`]).
    pub fn assemble(&self, words: &[String], blend_width: usize) -> MediaResult<PoseSequence> {
        if words.is_empty() {
            return Err(MediaError::invalid_request("no words to animate"));
        }

        // Resolve everything first so a late miss returns nothing partial.
        let sequences = words
            .iter()
            .map(|word| self.source.resolve(word))
            .collect::<MediaResult<Vec<_>>>()?;

        let mut iter = sequences.into_iter();
        let mut assembled = iter.next().unwrap_or_default();
        for next in iter {
            assembled = blend_sequences(assembled, next, blend_width);
        }

        info!(
            words = words.len(),
            frames = assembled.len(),
            blend_width,
            "Assembled pose sequence"
        );
        Ok(assembled)
    }
}

/// Concatenate `a` and `b`, cross-fading `k` frames at the seam.
///
/// The trailing `k` frames of `a` and leading `k` frames of `b` are replaced
/// by `k` frames `(1 - w) * a[len - k + i] + w * b[i]` with
/// `w = (i + 1) / (k + 1)`, so the result has `len(a) + len(b) - k` frames.
/// Falls back to a hard cut when `k == 0` or either side is shorter than `k`.
pub fn blend_sequences(a: PoseSequence, b: PoseSequence, k: usize) -> PoseSequence {
    if k == 0 || a.len() < k || b.len() < k {
        let mut out = a;
        out.extend(b);
        return out;
    }

    debug!(left = a.len(), right = b.len(), k, "Blending sequences");

    let a_frames = a.into_frames();
    let b_frames = b.into_frames();
    let split = a_frames.len() - k;

    let mut frames: Vec<PoseFrame> = Vec::with_capacity(split + b_frames.len());
    frames.extend_from_slice(&a_frames[..split]);
    for i in 0..k {
        let weight = (i + 1) as f32 / (k + 1) as f32;
        frames.push(a_frames[split + i].lerp(&b_frames[i], weight));
    }
    frames.extend(b_frames.into_iter().skip(k));

    PoseSequence::new(frames)
}

/// Mirror a sequence for a left-handed signer.
///
/// Negates the y and z components of every axis-angle triple in the frame
/// (root, body and both hands). Applying it twice is the identity.
pub fn mirror_pose(sequence: &mut PoseSequence) {
    for frame in sequence.frames_mut() {
        for triple in frame.as_mut_slice().chunks_exact_mut(3) {
            triple[1] = -triple[1];
            triple[2] = -triple[2];
        }
    }
}
