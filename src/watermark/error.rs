//! Watermark error types.

use std::fmt;

/// Errors that can occur while rendering a watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// Failed to fetch the logo asset
    FetchError(String),

    /// Failed to decode the source image or logo
    DecodeError(String),

    /// Failed to render a text watermark (including missing font)
    RenderError(String),

    /// Failed to encode the output image
    EncodeError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchError(msg) => write!(f, "Failed to fetch watermark logo: {}", msg),
            Self::DecodeError(msg) => write!(f, "Failed to decode image: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render text watermark: {}", msg),
            Self::EncodeError(msg) => write!(f, "Failed to encode image: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
