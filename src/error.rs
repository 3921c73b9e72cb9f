//! Error types for Modelar

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing input `{name}` in the step context")]
    MissingInput { name: &'static str },

    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
}

impl Error {
    pub(crate) fn shape_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
