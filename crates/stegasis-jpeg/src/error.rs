//! Error types for the coefficient codec.

use std::fmt;
use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, JpegError>;

/// Errors that can occur while decoding or encoding a JPEG image.
#[derive(Error)]
pub enum JpegError {
    /// The byte stream violates the baseline JPEG format.
    #[error("format error: {reason}")]
    Format { reason: String },

    /// The byte stream is valid JPEG but uses a feature this codec does not handle.
    #[error("unsupported feature: {reason}")]
    Unsupported { reason: String },

    /// Linear coefficient access outside of `[0, size)`.
    #[error("coefficient index {index} out of bounds for size {size}")]
    OutOfBounds { index: usize, size: usize },

    /// The image was decoded from memory and has no file to write back to.
    #[error("image has no source path to encode to")]
    NoPath,

    /// I/O error while reading or writing image bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JpegError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        JpegError::Format {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        JpegError::Unsupported {
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for JpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use Display for Debug so unwrap() shows user-friendly messages
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_uses_display() {
        let err = JpegError::format("missing 0xFF00 sequence");
        assert_eq!(format!("{err:?}"), "format error: missing 0xFF00 sequence");
    }

    #[test]
    fn test_out_of_bounds_message() {
        let err = JpegError::OutOfBounds { index: 3, size: 0 };
        assert_eq!(err.to_string(), "coefficient index 3 out of bounds for size 0");
    }
}
