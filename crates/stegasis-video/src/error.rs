use std::path::PathBuf;

use stegasis_jpeg::JpegError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VideoError>;

#[derive(Error, Debug)]
pub enum VideoError {
    /// Represents a failure to list the frame directory
    #[error("Could not read frame directory {path:?}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Represents a failure to read a single frame file
    #[error("Could not read frame {name}")]
    ReadFrame {
        name: String,
        source: std::io::Error,
    },

    /// Represents a frame file that is not a decodable baseline JPEG
    #[error("Could not decode frame {name}: {source}")]
    DecodeFrame { name: String, source: JpegError },

    /// Represents a failure to write a modified frame back to disk
    #[error("Could not encode frame {index}: {source}")]
    EncodeFrame { index: usize, source: JpegError },

    /// Represents a file name without a frame number, expected is `<prefix>-<n>.<ext>`
    #[error("No frame index in file name {name:?}")]
    FrameName { name: String },

    /// Represents a gap in the frame numbering
    #[error("Frame {index} is missing")]
    MissingFrame { index: usize },

    /// Represents two files claiming the same frame number
    #[error("Frame {index} appears more than once")]
    DuplicateFrame { index: usize },

    /// Represents an access past the last frame
    #[error("Frame {index} out of bounds, there are {frames} frames")]
    FrameOutOfBounds { index: usize, frames: usize },

    /// Represents a failed coefficient access on a decoded frame
    #[error(transparent)]
    Frame(#[from] JpegError),

    /// Represents frame access before the frames were decoded
    #[error("Frames have not been decoded")]
    NotDecoded,

    /// Represents a failure to set up the decode worker pool
    #[error("Could not build the decode thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
