// ============================================================
// Error Taxonomy
// ============================================================
// Every failure the library can report falls into one of these
// variants. The CLI and web layers wrap them in anyhow / HTTP
// responses; the library itself never panics on bad input.
//
//   Configuration      — bad paths, empty corpus, invalid split
//   Input              — undecodable image bytes at inference time
//   CheckpointMismatch — checkpoint built for another architecture
//                        or label vocabulary
//   Checkpoint         — checkpoint files missing or unreadable
//   Training           — the optimiser diverged (non-finite loss)
//   Inference          — numerical failure inside a forward pass

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmotionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("checkpoint mismatch: {0}")]
    CheckpointMismatch(String),

    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("inference error: {0}")]
    Inference(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmotionError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn mismatch(msg: impl Into<String>) -> Self {
        Self::CheckpointMismatch(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// True for errors that must stop a run or prevent a service from
    /// starting. Input and inference errors only affect one request.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Input(_) | Self::Inference(_))
    }
}

pub type Result<T> = std::result::Result<T, EmotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_request_errors_are_not_fatal() {
        assert!(!EmotionError::input("truncated png").is_fatal());
        assert!(!EmotionError::inference("NaN logits").is_fatal());
    }

    #[test]
    fn startup_errors_are_fatal() {
        assert!(EmotionError::configuration("empty corpus").is_fatal());
        assert!(EmotionError::mismatch("labels differ").is_fatal());
        assert!(EmotionError::training("loss became NaN").is_fatal());
    }

    #[test]
    fn messages_name_the_category() {
        let e = EmotionError::configuration("no samples in 'data/'");
        assert_eq!(e.to_string(), "configuration error: no samples in 'data/'");
    }
}
