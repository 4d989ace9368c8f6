// ============================================================
// Layer 4 — Sample Dataset
// ============================================================
// One partition (train or validation) of the corpus, exposed
// through burn's Dataset trait. Items are still file paths;
// decoding happens when a batch is built.

use burn::data::dataset::Dataset;

use crate::domain::sample::Sample;

#[derive(Debug, Clone)]
pub struct SampleDataset {
    samples: Vec<Sample>,
}

impl SampleDataset {
    pub fn new(samples: Vec<Sample>) -> Self { Self { samples } }
}

impl Dataset<Sample> for SampleDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
