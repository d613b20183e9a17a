use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid player tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: &'static str },

    #[error("invalid reset hour {0} (expected 0..=23)")]
    InvalidResetHour(u32),
}
