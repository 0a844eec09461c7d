//! Error types.
//!
//! - `ProfileError`: failures of the numeric core (malformed histograms, bad configuration)
//! - `AppError`: what the binary reports, carrying the process exit code
//!
//! Fit non-convergence is *not* an error; it is encoded in `FitResult::status`.

use thiserror::Error;

/// Errors raised by the extraction core and configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProfileError {
    /// Histogram edges/contents lengths disagree (`edges` must be `contents + 1`).
    #[error("layer {layer}: shape mismatch ({edges} edges for {contents} bin contents)")]
    ShapeMismatch {
        layer: usize,
        edges: usize,
        contents: usize,
    },

    /// Bin edges are not strictly increasing.
    #[error("layer {layer}: bin edges are not strictly increasing")]
    NonMonotonicEdges { layer: usize },

    /// NaN or infinite edge/content.
    #[error("layer {layer}: non-finite edge or bin content")]
    NonFinite { layer: usize },

    /// A configuration value is out of its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        let exit_code = match err {
            ProfileError::InvalidConfig(_) => 2,
            _ => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_errors_map_to_exit_codes() {
        let shape: AppError = ProfileError::ShapeMismatch {
            layer: 2,
            edges: 4,
            contents: 4,
        }
        .into();
        assert_eq!(shape.exit_code(), 3);
        assert_eq!(shape.message(), "layer 2: shape mismatch (4 edges for 4 bin contents)");

        let config: AppError = ProfileError::InvalidConfig("epsilon must be > 0".to_string()).into();
        assert_eq!(config.exit_code(), 2);
    }
}
