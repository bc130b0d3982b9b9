//! Hiding data in the DCT coefficients of video frames
//!
//! A video is handled as a directory of single-frame baseline JPEG files
//! named `image-<n>.jpeg`, as produced by a frame extractor. This crate
//! decodes all frames in parallel into an index-addressable collection of
//! coefficient stores and later writes back only the frames that changed.
//!
//! Turning a video into frames and back, and deciding which coefficients
//! carry data, is left to the caller.
//!
//! # Example
//!
//! ```no_run
//! use stegasis_video::{Codec, MotionJpegCodec, MotionJpegCodecOptions};
//!
//! let mut codec = MotionJpegCodec::new("frames/", MotionJpegCodecOptions::default());
//! codec.decode()?;
//! let frame = codec.get_frame_mut(0)?;
//! let value = frame.get_element(1)?;
//! frame.set_element(1, value | 1)?;
//! codec.encode()?;
//! # Ok::<(), stegasis_video::VideoError>(())
//! ```

mod error;
mod motion_jpeg;
mod options;

pub use error::{Result, VideoError};
pub use motion_jpeg::{frame_index, MotionJpegCodec};
pub use options::{MotionJpegCodecOptions, DEFAULT_CONCURRENCY};

use stegasis_jpeg::{Jpeg, JpegError};

/// A video as a sequence of frames whose coefficients can be read and written.
pub trait Codec {
    /// Load all frames.
    fn decode(&mut self) -> Result<()>;

    /// Persist all modified frames.
    fn encode(&mut self) -> Result<()>;

    /// Frame `index`. Fails with [`VideoError::FrameOutOfBounds`] when
    /// `index >= frames()` and with [`VideoError::NotDecoded`] before `decode`.
    fn get_frame(&self, index: usize) -> Result<&dyn Frame>;

    /// Mutable access to frame `index`, with the same errors as `get_frame`.
    fn get_frame_mut(&mut self, index: usize) -> Result<&mut dyn Frame>;

    /// Number of frames, 0 before decoding.
    fn frames(&self) -> usize;

    /// Release all frames.
    fn close(&mut self) -> Result<()>;
}

/// One frame as a flat sequence of coefficients.
pub trait Frame: Send {
    /// Number of coefficients, 64 per block.
    fn size(&self) -> usize;

    /// Coefficient `index`; [`JpegError::OutOfBounds`] when `index >= size()`.
    fn get_element(&self, index: usize) -> std::result::Result<i32, JpegError>;

    /// Overwrite coefficient `index` and mark the frame dirty.
    /// [`JpegError::OutOfBounds`] when `index >= size()`, leaving the frame untouched.
    fn set_element(&mut self, index: usize, value: i32) -> std::result::Result<(), JpegError>;

    /// True once a coefficient changed since decode or the last encode.
    fn is_dirty(&self) -> bool;
}

impl Frame for Jpeg {
    fn size(&self) -> usize {
        Jpeg::size(self)
    }

    fn get_element(&self, index: usize) -> std::result::Result<i32, JpegError> {
        self.get(index)
    }

    fn set_element(&mut self, index: usize, value: i32) -> std::result::Result<(), JpegError> {
        self.set(index, value)
    }

    fn is_dirty(&self) -> bool {
        Jpeg::is_dirty(self)
    }
}
