// ============================================================
// Layer 5 — Emotion CNN
// ============================================================
// A small convolutional classifier:
//
//   images [batch, C, S, S]
//     │  ConvBlock × N   (conv 3x3, pad 1 → ReLU → max-pool 2x2)
//     ▼
//   features [batch, channels_N, S / 2^N, S / 2^N]
//     │  flatten
//     ▼
//   Linear(feature_width → hidden) → ReLU → Dropout
//     │
//     ▼
//   Linear(hidden → num_classes)  → logits [batch, num_classes]
//
// The head's input width is computed from the config when the
// model is built and stored on the model; it never depends on
// the first input seen.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::error::EmotionError;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug, PartialEq)]
pub struct EmotionNetConfig {
    pub num_classes:   usize,
    /// Output channels of each conv stage, in order
    pub conv_channels: Vec<usize>,
    pub hidden_size:   usize,
    #[config(default = 0.5)]
    pub dropout:       f64,
    #[config(default = 56)]
    pub input_size:    usize,
    #[config(default = 3)]
    pub in_channels:   usize,
}

impl EmotionNetConfig {
    /// Side length of the feature map after every conv stage.
    /// A padded 3x3 conv keeps the side; each 2x2 pool halves it (floor).
    pub fn feature_side(&self) -> usize {
        self.conv_channels
            .iter()
            .fold(self.input_size, |side, _| side / 2)
    }

    /// Flattened width of the feature extractor's output.
    pub fn feature_width(&self) -> usize {
        let channels = self.conv_channels.last().copied().unwrap_or(self.in_channels);
        let side     = self.feature_side();
        channels * side * side
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.num_classes < 2 {
            return Err(EmotionError::configuration(format!(
                "model needs at least 2 classes, got {}", self.num_classes
            )));
        }
        if self.conv_channels.is_empty() || self.conv_channels.contains(&0) {
            return Err(EmotionError::configuration(format!(
                "conv_channels must be non-empty and positive, got {:?}", self.conv_channels
            )));
        }
        if self.hidden_size == 0 || self.in_channels == 0 {
            return Err(EmotionError::configuration("hidden_size and in_channels must be positive"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(EmotionError::configuration(format!(
                "dropout must be in [0, 1), got {}", self.dropout
            )));
        }
        if self.feature_side() == 0 {
            return Err(EmotionError::configuration(format!(
                "input size {} is too small for {} pooling stages",
                self.input_size,
                self.conv_channels.len()
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> EmotionNet<B> {
        let mut features = Vec::with_capacity(self.conv_channels.len());
        let mut in_ch    = self.in_channels;
        for &out_ch in &self.conv_channels {
            features.push(ConvBlock::new(in_ch, out_ch, device));
            in_ch = out_ch;
        }

        let feature_width = self.feature_width();
        EmotionNet {
            features,
            hidden:     LinearConfig::new(feature_width, self.hidden_size).init(device),
            output:     LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            activation: Relu::new(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            feature_width,
        }
    }
}

#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv:       Conv2d<B>,
    pub activation: Relu,
    pub pool:       MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        Self { conv, activation: Relu::new(), pool }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.activation.forward(self.conv.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct EmotionNet<B: Backend> {
    pub features:      Vec<ConvBlock<B>>,
    pub hidden:        Linear<B>,
    pub output:        Linear<B>,
    pub activation:    Relu,
    pub dropout:       Dropout,
    pub feature_width: usize,
}

/// Name and shape of one learned parameter tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerShape {
    pub name:  String,
    pub shape: Vec<usize>,
}

impl<B: Backend> EmotionNet<B> {
    /// images: [batch, C, S, S] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images;
        for block in &self.features {
            x = block.forward(x);
        }
        let x = x.flatten::<2>(1, 3);
        debug_assert_eq!(x.dims()[1], self.feature_width);

        let x = self.activation.forward(self.hidden.forward(x));
        let x = self.dropout.forward(x);
        self.output.forward(x)
    }

    /// Mean cross-entropy over the batch, plus the logits it was computed from.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let ce     = CrossEntropyLossConfig::new().init(&logits.device());
        let loss   = ce.forward(logits.clone(), targets);
        (loss, logits)
    }

    pub fn num_classes(&self) -> usize {
        self.output.weight.val().dims()[1]
    }

    /// Every learned tensor in forward order, e.g. for checkpoint inspection.
    pub fn layer_shapes(&self) -> Vec<LayerShape> {
        let mut shapes = Vec::new();
        let mut push   = |name: String, shape: Vec<usize>| shapes.push(LayerShape { name, shape });

        for (i, block) in self.features.iter().enumerate() {
            push(format!("features.{i}.conv.weight"), block.conv.weight.val().dims().to_vec());
            if let Some(bias) = &block.conv.bias {
                push(format!("features.{i}.conv.bias"), bias.val().dims().to_vec());
            }
        }
        for (name, linear) in [("hidden", &self.hidden), ("output", &self.output)] {
            push(format!("{name}.weight"), linear.weight.val().dims().to_vec());
            if let Some(bias) = &linear.bias {
                push(format!("{name}.bias"), bias.val().dims().to_vec());
            }
        }
        shapes
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> EmotionNetConfig {
        EmotionNetConfig::new(2, vec![4, 8], 16)
    }

    #[test]
    fn feature_width_is_known_before_any_forward_pass() {
        // 56 → 28 → 14
        assert_eq!(small_config().feature_width(), 8 * 14 * 14);
        // odd sides floor: 57 → 28 → 14
        assert_eq!(small_config().with_input_size(57).feature_width(), 8 * 14 * 14);

        let model: EmotionNet<TestBackend> = small_config().init(&Default::default());
        assert_eq!(model.feature_width, 8 * 14 * 14);
    }

    #[test]
    fn forward_produces_one_logit_per_class() {
        let device = Default::default();
        let model: EmotionNet<TestBackend> = small_config().init(&device);
        let images = Tensor::<TestBackend, 4>::zeros([3, 3, 56, 56], &device);
        assert_eq!(model.forward(images).dims(), [3, 2]);
        assert_eq!(model.num_classes(), 2);
    }

    #[test]
    fn forward_is_deterministic_without_autodiff() {
        let device = Default::default();
        let model: EmotionNet<TestBackend> = small_config().init(&device);
        let images = Tensor::<TestBackend, 4>::ones([1, 3, 56, 56], &device);

        let a = model.forward(images.clone()).into_data().to_vec::<f32>().unwrap();
        let b = model.forward(images).into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn loss_is_finite_and_scalar() {
        let device  = Default::default();
        let model: EmotionNet<TestBackend> = small_config().init(&device);
        let images  = Tensor::<TestBackend, 4>::zeros([2, 3, 56, 56], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![0i64, 1], [2]), &device);

        let (loss, logits) = model.forward_loss(images, targets);
        assert_eq!(logits.dims(), [2, 2]);
        assert!(loss.into_scalar().elem::<f32>().is_finite());
    }

    #[test]
    fn layer_shapes_match_parameter_count() {
        let model: EmotionNet<TestBackend> = small_config().init(&Default::default());
        let shapes = model.layer_shapes();
        assert_eq!(shapes.len(), 8);
        assert_eq!(shapes[0].shape, vec![4, 3, 3, 3]);
        assert_eq!(shapes[4].name, "hidden.weight");

        let counted: usize = shapes.iter().map(|s| s.shape.iter().product::<usize>()).sum();
        assert_eq!(counted, model.num_params());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(small_config().validate().is_ok());
        assert!(EmotionNetConfig::new(1, vec![4], 8).validate().is_err());
        assert!(EmotionNetConfig::new(2, vec![], 8).validate().is_err());
        assert!(small_config().with_dropout(1.0).validate().is_err());
        // 6 halvings of 56 reach zero
        assert!(EmotionNetConfig::new(2, vec![2; 6], 8).validate().is_err());
    }
}
