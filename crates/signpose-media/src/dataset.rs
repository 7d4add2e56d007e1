//! Word to pose sequence lookup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use signpose_models::{normalize_word, GlossMapping, PoseRecord, PoseSequence};

use crate::error::{MediaError, MediaResult};

/// Resolves gloss words to their precomputed pose sequences.
pub trait PoseSource: Send + Sync {
    /// Load the sequence for one word, or fail with
    /// [`MediaError::WordNotFound`].
    fn resolve(&self, word: &str) -> MediaResult<PoseSequence>;

    /// All words this source can resolve, sorted.
    fn words(&self) -> Vec<String>;
}

/// File-backed gloss dataset: a mapping JSON plus one JSON record per word.
#[derive(Debug, Clone)]
pub struct GlossDataset {
    mapping: GlossMapping,
    dataset_dir: PathBuf,
}

impl GlossDataset {
    /// Load the mapping file and bind it to the record directory.
    pub fn open(mapping_path: impl AsRef<Path>, dataset_dir: impl AsRef<Path>) -> MediaResult<Self> {
        let mapping_path = mapping_path.as_ref();
        if !mapping_path.exists() {
            return Err(MediaError::FileNotFound(mapping_path.to_path_buf()));
        }

        let json = std::fs::read_to_string(mapping_path)?;
        let mapping = GlossMapping::from_json(&json)?;
        info!(
            words = mapping.len(),
            mapping = %mapping_path.display(),
            "Loaded gloss mapping"
        );

        Ok(Self::new(mapping, dataset_dir))
    }

    pub fn new(mapping: GlossMapping, dataset_dir: impl AsRef<Path>) -> Self {
        Self {
            mapping,
            dataset_dir: dataset_dir.as_ref().to_path_buf(),
        }
    }

    pub fn dataset_dir(&self) -> &Path {
        &self.dataset_dir
    }
}

impl PoseSource for GlossDataset {
    fn resolve(&self, word: &str) -> MediaResult<PoseSequence> {
        let entry = self
            .mapping
            .resolve(word)
            .ok_or_else(|| MediaError::word_not_found(word))?;

        let path = self.dataset_dir.join(&entry.file);
        if !path.exists() {
            return Err(MediaError::FileNotFound(path));
        }

        debug!(word = %entry.word, path = %path.display(), "Loading pose record");
        let json = std::fs::read_to_string(&path)?;
        let record: PoseRecord = serde_json::from_str(&json).map_err(|e| {
            MediaError::invalid_pose(format!("{}: 'smplx' missing or malformed: {}", entry.file, e))
        })?;

        record
            .into_sequence()
            .map_err(|e| MediaError::invalid_pose(format!("{}: {}", entry.file, e)))
    }

    fn words(&self) -> Vec<String> {
        self.mapping.words()
    }
}

/// Sequences held in memory, keyed by normalized word.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPoseSource {
    sequences: BTreeMap<String, PoseSequence>,
}

impl InMemoryPoseSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_word(mut self, word: &str, sequence: PoseSequence) -> Self {
        self.sequences.insert(normalize_word(word), sequence);
        self
    }
}

impl PoseSource for InMemoryPoseSource {
    fn resolve(&self, word: &str) -> MediaResult<PoseSequence> {
        let sequence = self
            .sequences
            .get(&normalize_word(word))
            .cloned()
            .ok_or_else(|| MediaError::word_not_found(word))?;
        sequence.ensure_non_empty()?;
        Ok(sequence)
    }

    fn words(&self) -> Vec<String> {
        self.sequences.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use signpose_models::POSE_DIM;
    use std::fs;

    fn write_dataset(dir: &Path) -> PathBuf {
        let row = vec!["0.1"; POSE_DIM].join(",");
        fs::write(
            dir.join("00001.json"),
            format!(r#"{{"smplx": [[{row}], [{row}]]}}"#),
        )
        .unwrap();
        fs::write(dir.join("00002.json"), r#"{"smplx": [[1.0, 2.0]]}"#).unwrap();
        fs::write(dir.join("00003.json"), r#"{"pose": []}"#).unwrap();
        let mapping = dir.join("mapping.json");
        fs::write(
            &mapping,
            r#"{"00001.json": "Hello", "00002.json": "short", "00003.json": "nosmplx", "00004.json": "ghost"}"#,
        )
        .unwrap();
        mapping
    }

    #[test]
    fn test_resolve_known_word() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = write_dataset(dir.path());
        let dataset = GlossDataset::open(&mapping, dir.path()).unwrap();

        let seq = dataset.resolve("hello").unwrap();
        assert_eq!(seq.len(), 2);
        assert!((seq.frames()[1].as_slice()[155] - 0.1).abs() < 1e-6);
        assert_eq!(dataset.words(), vec!["ghost", "hello", "nosmplx", "short"]);
    }

    #[test]
    fn test_error_classification() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = write_dataset(dir.path());
        let dataset = GlossDataset::open(&mapping, dir.path()).unwrap();

        assert_eq!(dataset.resolve("nope").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(dataset.resolve("short").unwrap_err().kind(), ErrorKind::Invalid);
        assert_eq!(dataset.resolve("nosmplx").unwrap_err().kind(), ErrorKind::Invalid);
        assert!(matches!(
            dataset.resolve("ghost").unwrap_err(),
            MediaError::FileNotFound(_)
        ));
    }

    #[test]
    fn test_missing_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = GlossDataset::open(dir.path().join("none.json"), dir.path()).unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_in_memory_source_normalizes() {
        let source = InMemoryPoseSource::new().with_word(
            " Thanks ",
            PoseSequence::from_rows(vec![vec![0.0; POSE_DIM]]).unwrap(),
        );
        assert!(source.resolve("THANKS").is_ok());
        assert_eq!(source.words(), vec!["thanks"]);
    }
}
