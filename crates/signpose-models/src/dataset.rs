//! Gloss dataset records.
//!
//! The dataset is a directory of per-word pose records plus one JSON mapping
//! file `{ "<record file>": "<gloss>" }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::pose::{PoseError, PoseSequence};
use crate::request::normalize_word;

/// One dataset word and the record file that holds its motion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub file: String,
}

/// On-disk pose record. Only the `smplx` field is read.
///
/// JSON cannot carry NaN, so `null` entries are read as NaN and left for the
/// evaluator to sanitize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseRecord {
    #[serde(deserialize_with = "deserialize_rows")]
    pub smplx: Vec<Vec<f32>>,
}

impl PoseRecord {
    /// Validate frame lengths and convert into a sequence.
    pub fn into_sequence(self) -> Result<PoseSequence, PoseError> {
        let sequence = PoseSequence::from_rows(self.smplx)?;
        sequence.ensure_non_empty()?;
        Ok(sequence)
    }
}

fn deserialize_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows: Vec<Vec<Option<f32>>> = Vec::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
        .collect())
}

/// Word to record-file lookup, built by inverting the gloss mapping file.
#[derive(Debug, Clone, Default)]
pub struct GlossMapping {
    word_to_file: BTreeMap<String, String>,
}

impl GlossMapping {
    /// Invert a `{file: gloss}` map. Glosses are normalized (trimmed,
    /// lowercased); when two files share a gloss the later file name in
    /// sort order wins.
    pub fn from_file_to_gloss(file_to_gloss: BTreeMap<String, String>) -> Self {
        let word_to_file = file_to_gloss
            .into_iter()
            .map(|(file, gloss)| (normalize_word(&gloss), file))
            .filter(|(word, _)| !word.is_empty())
            .collect();
        Self { word_to_file }
    }

    /// Parse the mapping JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)?;
        Ok(Self::from_file_to_gloss(raw))
    }

    pub fn resolve(&self, word: &str) -> Option<WordEntry> {
        let word = normalize_word(word);
        self.word_to_file.get(&word).map(|file| WordEntry {
            word,
            file: file.clone(),
        })
    }

    /// All known words, sorted.
    pub fn words(&self) -> Vec<String> {
        self.word_to_file.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.word_to_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_file.is_empty()
    }
}
