/**
 * Error taxonomy
 * Every failure a register/verify call or a batch can surface
 */

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaceKeyError {
    /// The codec tables have not been built yet.
    #[error("codec is not initialized")]
    NotInitialized,

    #[error("expected {expected} distances, got {actual}")]
    InvalidDistancesCount { expected: usize, actual: usize },

    #[error("distance at index {index} is not a finite number")]
    InvalidValue { index: usize },

    /// The received word is farther than `t` bits from any codeword.
    #[error("error correction failed: received word is not decodable")]
    CodecFailure,

    /// The payload cannot hold a full secret. Only reachable with broken
    /// code parameters.
    #[error("recovered secret has {available} bytes, need 32")]
    InsufficientSecretBytes { available: usize },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("insufficient frames: need {required}, have {available}")]
    InsufficientFrames { required: usize, available: usize },

    #[error("invalid code parameters: {0}")]
    InvalidCodeParameters(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("system randomness unavailable")]
    RandomnessUnavailable,

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl FaceKeyError {
    /// Errors that only reject the current frame or record. A batch keeps
    /// going after one of these.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            FaceKeyError::InvalidDistancesCount { .. }
                | FaceKeyError::InvalidValue { .. }
                | FaceKeyError::CodecFailure
                | FaceKeyError::MalformedRecord(_)
        )
    }
}

impl From<tokio::task::JoinError> for FaceKeyError {
    fn from(err: tokio::task::JoinError) -> Self {
        FaceKeyError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FaceKeyError>;
