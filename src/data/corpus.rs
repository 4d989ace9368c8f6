// ============================================================
// Layer 4 — Labelled Image Corpus
// ============================================================
// Scans a dataset directory laid out as:
//
//   root/
//     person_01/
//       happy.jpg      → label "happy"
//       sad.png        → label "sad"
//       notes.txt      → skipped (stem not in vocabulary)
//     person_02/
//       ...
//
// Sub-directories only group files; the label always comes
// from the lower-cased file stem. Files whose stem is not in
// the vocabulary are skipped with a diagnostic. Entries are
// visited in sorted order so a fixed seed always produces the
// same split, whatever order the filesystem returns.
//
// The corpus is read-only once scanned.

use std::{fs, path::{Path, PathBuf}};

use crate::domain::{sample::Sample, traits::SampleSource, vocabulary::LabelVocabulary};
use crate::error::{EmotionError, Result};

#[derive(Debug, Clone)]
pub struct LabeledImageCorpus {
    samples: Vec<Sample>,
}

impl LabeledImageCorpus {
    /// Scan `root` and label every file against `vocabulary`.
    ///
    /// Fails with a configuration error when the root is not a
    /// readable directory or when no file matches a label.
    pub fn scan(root: impl AsRef<Path>, vocabulary: &LabelVocabulary) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.is_dir() {
            return Err(EmotionError::configuration(format!(
                "dataset directory '{}' does not exist or is not a directory",
                root.display()
            )));
        }

        tracing::info!("Scanning dataset directory '{}'", root.display());

        let mut samples = Vec::new();
        let mut skipped = 0usize;

        for group in sorted_entries(&root)? {
            if !group.is_dir() {
                tracing::debug!("Ignoring top-level file '{}'", group.display());
                continue;
            }

            for path in sorted_entries(&group)? {
                if !path.is_file() {
                    continue;
                }
                match label_for(&path, vocabulary) {
                    Some(label) => {
                        tracing::debug!("Sample '{}' → {}", path.display(), label);
                        samples.push(Sample::new(path, label));
                    }
                    None => {
                        skipped += 1;
                        tracing::warn!("Skipping '{}': name is not a known emotion", path.display());
                    }
                }
            }
        }

        if samples.is_empty() {
            return Err(EmotionError::configuration(format!(
                "no labelled images found under '{}' (expected <group>/<emotion>.<ext> \
                 with emotion one of [{}])",
                root.display(),
                vocabulary.names().join(", ")
            )));
        }

        tracing::info!("Corpus: {} samples, {} files skipped", samples.len(), skipped);
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples per vocabulary index.
    pub fn class_counts(&self, vocabulary: &LabelVocabulary) -> Vec<usize> {
        let mut counts = vec![0usize; vocabulary.len()];
        for s in &self.samples {
            counts[s.label] += 1;
        }
        counts
    }
}

impl SampleSource for LabeledImageCorpus {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn sample(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }
}

/// Lower-case the file stem and look it up in the vocabulary.
fn label_for(path: &Path, vocabulary: &LabelVocabulary) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    vocabulary.index_of(&stem.to_lowercase())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let reader = fs::read_dir(dir).map_err(|e| {
        EmotionError::configuration(format!("cannot read directory '{}': {e}", dir.display()))
    })?;
    for entry in reader {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, group: &str, file: &str) {
        let g = dir.join(group);
        fs::create_dir_all(&g).unwrap();
        fs::write(g.join(file), b"not decoded during scan").unwrap();
    }

    #[test]
    fn labels_come_from_file_stems() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "p1", "Happy.jpg");
        touch(tmp.path(), "p1", "sad.png");
        touch(tmp.path(), "p2", "anger.jpg");

        let vocab  = LabelVocabulary::standard();
        let corpus = LabeledImageCorpus::scan(tmp.path(), &vocab).unwrap();

        assert_eq!(corpus.len(), 3);
        let labels: Vec<usize> = corpus.samples().iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec![
                vocab.index_of("happy").unwrap(),
                vocab.index_of("sad").unwrap(),
                vocab.index_of("anger").unwrap(),
            ]
        );
    }

    #[test]
    fn unknown_names_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "p1", "happy.jpg");
        touch(tmp.path(), "p1", "angry.jpg");
        touch(tmp.path(), "p1", "readme.txt");
        fs::write(tmp.path().join("sad.jpg"), b"top-level files are ignored").unwrap();

        let vocab  = LabelVocabulary::standard();
        let corpus = LabeledImageCorpus::scan(tmp.path(), &vocab).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(corpus.samples().iter().all(|s| s.label < vocab.len()));
    }

    #[test]
    fn empty_corpus_names_the_path() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "p1", "unknown.jpg");

        let err = LabeledImageCorpus::scan(tmp.path(), &LabelVocabulary::standard()).unwrap_err();
        assert!(matches!(err, EmotionError::Configuration(_)));
        assert!(err.to_string().contains(&tmp.path().display().to_string()));
    }

    #[test]
    fn missing_root_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LabeledImageCorpus::scan(tmp.path().join("nope"), &LabelVocabulary::standard())
            .unwrap_err();
        assert!(matches!(err, EmotionError::Configuration(_)));
    }
}
