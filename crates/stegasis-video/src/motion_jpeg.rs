use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use rayon::prelude::*;
use stegasis_jpeg::Jpeg;

use crate::{Codec, Frame, MotionJpegCodecOptions, Result, VideoError};

/// Every this many decoded frames a progress line is logged.
const PROGRESS_INTERVAL: usize = 50;

/// Extract the frame number from a file name like `image-17.jpeg`.
///
/// The number is the text after the last `-` of the part before the first `.`.
pub fn frame_index(file_name: &str) -> Option<usize> {
    let stem = file_name.split('.').next()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

/// A frame file found in the frame directory.
#[derive(Debug)]
struct FrameFile {
    index: usize,
    name: String,
    path: PathBuf,
}

/// Video codec over a directory of single-image baseline JPEG frames.
///
/// The directory is expected to hold exactly the frames `image-0.jpeg` to
/// `image-<n-1>.jpeg` (any prefix and extension). Frames are decoded in
/// parallel and each one is written back to its own file when modified.
#[derive(Debug)]
pub struct MotionJpegCodec {
    frames_dir: PathBuf,
    options: MotionJpegCodecOptions,
    frames: Option<Vec<Jpeg>>,
}

impl MotionJpegCodec {
    pub fn new<P: Into<PathBuf>>(frames_dir: P, options: MotionJpegCodecOptions) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            options,
            frames: None,
        }
    }

    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    pub fn options(&self) -> &MotionJpegCodecOptions {
        &self.options
    }

    /// Decode all frames, reading each file through `loader`.
    ///
    /// Frames are decoded on a dedicated pool of `options.concurrency`
    /// threads. Each result lands in the slot given by its file name, so the
    /// order in which decodes finish does not matter. The first failure stops
    /// the batch and is returned; no frames are kept in that case.
    pub fn decode_with<L>(&mut self, loader: L) -> Result<()>
    where
        L: Fn(&Path) -> io::Result<Vec<u8>> + Sync,
    {
        self.frames = None;
        let files = self.list_frames()?;
        let count = files.len();

        log::info!(
            "Decoding {} frames from {:?} with {} workers",
            count,
            self.frames_dir,
            self.options.worker_count()
        );
        let now = Instant::now();

        let slots: Mutex<Vec<Option<Jpeg>>> = Mutex::new((0..count).map(|_| None).collect());
        let left = AtomicUsize::new(count);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.worker_count())
            .thread_name(|i| format!("frame-decoder-{i}"))
            .build()?;

        pool.install(|| {
            files.par_iter().try_for_each(|file| {
                let jpeg = decode_frame(file, &loader)?;

                {
                    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
                    let slot = &mut slots[file.index];
                    if slot.is_some() {
                        return Err(VideoError::DuplicateFrame { index: file.index });
                    }
                    *slot = Some(jpeg);
                }

                let left = left.fetch_sub(1, Ordering::Relaxed) - 1;
                if left % PROGRESS_INTERVAL == 0 {
                    log::debug!("Frames left: {}", left);
                }
                Ok(())
            })
        })
        .inspect_err(|e| log::warn!("Frame decoding aborted: {}", e))?;

        let frames = slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(VideoError::MissingFrame { index }))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Finished decoding {} frames. Took: {:?}",
            frames.len(),
            now.elapsed()
        );
        self.frames = Some(frames);
        Ok(())
    }

    /// List the frame files sorted by index, rejecting gaps and duplicates.
    fn list_frames(&self) -> Result<Vec<FrameFile>> {
        let read_dir_err = |source| VideoError::ReadDir {
            path: self.frames_dir.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.frames_dir).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            if !entry.file_type().map_err(read_dir_err)?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = frame_index(&name).ok_or_else(|| VideoError::FrameName {
                name: name.clone(),
            })?;
            files.push(FrameFile {
                index,
                name,
                path: entry.path(),
            });
        }

        files.sort_by_key(|f| f.index);
        for (expected, file) in files.iter().enumerate() {
            if file.index < expected {
                return Err(VideoError::DuplicateFrame { index: file.index });
            }
            if file.index > expected {
                return Err(VideoError::MissingFrame { index: expected });
            }
        }
        Ok(files)
    }

    /// Typed access to a decoded frame.
    pub fn frame(&self, index: usize) -> Result<&Jpeg> {
        let frames = self.frames.as_ref().ok_or(VideoError::NotDecoded)?;
        frames.get(index).ok_or(VideoError::FrameOutOfBounds {
            index,
            frames: frames.len(),
        })
    }

    /// Typed mutable access to a decoded frame.
    pub fn frame_mut(&mut self, index: usize) -> Result<&mut Jpeg> {
        let frames = self.frames.as_mut().ok_or(VideoError::NotDecoded)?;
        let count = frames.len();
        frames.get_mut(index).ok_or(VideoError::FrameOutOfBounds {
            index,
            frames: count,
        })
    }

    /// Total number of coefficients over all decoded frames.
    pub fn capacity(&self) -> usize {
        self.frames
            .iter()
            .flatten()
            .map(|frame| frame.size())
            .sum()
    }
}

fn decode_frame<L>(file: &FrameFile, loader: &L) -> Result<Jpeg>
where
    L: Fn(&Path) -> io::Result<Vec<u8>>,
{
    let data = loader(&file.path).map_err(|source| VideoError::ReadFrame {
        name: file.name.clone(),
        source,
    })?;
    let jpeg = Jpeg::decode(&data).map_err(|source| VideoError::DecodeFrame {
        name: file.name.clone(),
        source,
    })?;
    Ok(jpeg.with_path(&file.path))
}

impl Codec for MotionJpegCodec {
    fn decode(&mut self) -> Result<()> {
        self.decode_with(|path| fs::read(path))
    }

    /// Write back every dirty frame in index order. Clean frames are not touched.
    fn encode(&mut self) -> Result<()> {
        let frames = self.frames.as_mut().ok_or(VideoError::NotDecoded)?;
        let mut written = 0;
        for (index, frame) in frames.iter_mut().enumerate() {
            if !frame.is_dirty() {
                continue;
            }
            frame
                .encode()
                .map_err(|source| VideoError::EncodeFrame { index, source })?;
            log::debug!("Encoded frame {}", index);
            written += 1;
        }
        log::info!("Encoded {} of {} frames", written, frames.len());
        Ok(())
    }

    fn get_frame(&self, index: usize) -> Result<&dyn Frame> {
        Ok(self.frame(index)?)
    }

    fn get_frame_mut(&mut self, index: usize) -> Result<&mut dyn Frame> {
        Ok(self.frame_mut(index)?)
    }

    fn frames(&self) -> usize {
        self.frames.as_ref().map_or(0, Vec::len)
    }

    fn close(&mut self) -> Result<()> {
        self.frames = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_frame_index() {
        assert_eq!(frame_index("image-0.jpeg"), Some(0));
        assert_eq!(frame_index("image-17.jpeg"), Some(17));
        assert_eq!(frame_index("my-video-frame-3.jpg"), Some(3));
        assert_eq!(frame_index("image-12.tar.gz"), Some(12));
    }

    #[test]
    fn should_reject_names_without_index() {
        assert_eq!(frame_index("image.jpeg"), None);
        assert_eq!(frame_index("image-.jpeg"), None);
        assert_eq!(frame_index("image-x.jpeg"), None);
        assert_eq!(frame_index("image-1a.jpeg"), None);
        assert_eq!(frame_index(""), None);
    }

    #[test]
    fn should_report_no_frames_before_decode() {
        let codec = MotionJpegCodec::new("does-not-exist", MotionJpegCodecOptions::default());
        assert_eq!(codec.frames(), 0);
        assert_eq!(codec.capacity(), 0);
        assert!(matches!(codec.get_frame(0), Err(VideoError::NotDecoded)));
    }

    #[test]
    fn should_fail_on_missing_directory() {
        let mut codec = MotionJpegCodec::new("does-not-exist", MotionJpegCodecOptions::default());
        assert!(matches!(codec.decode(), Err(VideoError::ReadDir { .. })));
        assert!(matches!(codec.encode(), Err(VideoError::NotDecoded)));
    }
}
