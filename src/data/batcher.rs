// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Decodes and preprocesses a mini-batch of samples and stacks
// them into tensors on the target device:
//
//   images:  [batch, 3, INPUT_SIZE, INPUT_SIZE]
//   targets: [batch]
//
// A sample that fails to decode is logged, counted and left out
// of the batch; the rest of the batch still trains. A batch in
// which every sample failed yields no tensors at all.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::preprocessor::{FaceTensor, Preprocessor, CHANNELS, INPUT_SIZE};
use crate::domain::sample::Sample;

#[derive(Debug, Clone)]
pub struct EmotionBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

/// A built batch plus the number of samples dropped while decoding.
#[derive(Debug, Clone)]
pub struct LoadedBatch<B: Backend> {
    pub batch:   Option<EmotionBatch<B>>,
    pub skipped: usize,
}

#[derive(Clone, Debug, Default)]
pub struct EmotionBatcher {
    preprocessor: Preprocessor,
}

impl EmotionBatcher {
    pub fn new() -> Self {
        Self { preprocessor: Preprocessor::new() }
    }

    /// Decode each sample's image from disk and stack the survivors.
    pub fn load<B: Backend>(&self, items: &[Sample], device: &B::Device) -> LoadedBatch<B> {
        let mut tensors = Vec::with_capacity(items.len());
        let mut labels  = Vec::with_capacity(items.len());
        let mut skipped = 0usize;

        for sample in items {
            match self.preprocessor.open(&sample.image_path) {
                Ok(image) => {
                    tensors.push(self.preprocessor.transform(&image, None));
                    labels.push(sample.label as i64);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping sample: {e}");
                }
            }
        }

        if tensors.is_empty() {
            return LoadedBatch { batch: None, skipped };
        }

        let n       = labels.len();
        let images  = stack_images::<B>(tensors, device);
        let targets = Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [n]), device);
        LoadedBatch { batch: Some(EmotionBatch { images, targets }), skipped }
    }
}

impl<B: Backend> Batcher<B, Sample, LoadedBatch<B>> for EmotionBatcher {
    fn batch(&self, items: Vec<Sample>, device: &B::Device) -> LoadedBatch<B> {
        self.load(&items, device)
    }
}

/// Stack preprocessed images into a [n, C, H, W] tensor.
pub fn stack_images<B: Backend>(tensors: Vec<FaceTensor>, device: &B::Device) -> Tensor<B, 4> {
    let n = tensors.len();
    let flat: Vec<f32> = tensors
        .into_iter()
        .flat_map(FaceTensor::into_vec)
        .collect();

    Tensor::<B, 4>::from_data(
        TensorData::new(flat, [n, CHANNELS, INPUT_SIZE, INPUT_SIZE]),
        device,
    )
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    #[test]
    fn corrupt_samples_are_skipped_and_counted() {
        let tmp  = tempfile::tempdir().unwrap();
        let good = tmp.path().join("happy.png");
        let bad  = tmp.path().join("sad.png");
        RgbImage::from_pixel(20, 20, Rgb([10, 200, 30])).save(&good).unwrap();
        std::fs::write(&bad, b"truncated").unwrap();

        let batcher = EmotionBatcher::new();
        let loaded: LoadedBatch<TestBackend> =
            batcher.batch(vec![Sample::new(&good, 4), Sample::new(&bad, 6)], &Default::default());

        assert_eq!(loaded.skipped, 1);
        let batch = loaded.batch.expect("one sample decoded");
        assert_eq!(batch.images.dims(), [1, CHANNELS, INPUT_SIZE, INPUT_SIZE]);
        assert_eq!(batch.targets.dims(), [1]);
        assert_eq!(batch.targets.into_data().to_vec::<i64>().unwrap(), vec![4]);
    }

    #[test]
    fn all_corrupt_yields_no_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("fear.jpg");
        std::fs::write(&bad, b"").unwrap();

        let batcher = EmotionBatcher::new();
        let loaded  = batcher.load::<TestBackend>(
            &[Sample::new(&bad, 3), Sample::new(tmp.path().join("missing.png"), 3)],
            &Default::default(),
        );
        assert!(loaded.batch.is_none());
        assert_eq!(loaded.skipped, 2);
    }
}
