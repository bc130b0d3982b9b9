/// Default number of frames decoded at the same time
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Options for the motion JPEG frame codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionJpegCodecOptions {
    /// Frame rate of the source video. Only carried along for whoever
    /// reassembles the frames into a video.
    pub frame_rate: Option<u32>,

    /// Upper bound of frames decoded in parallel. The pool size does not
    /// depend on the number of frames; 0 is treated as 1.
    pub concurrency: usize,
}

impl Default for MotionJpegCodecOptions {
    fn default() -> Self {
        Self {
            frame_rate: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl MotionJpegCodecOptions {
    pub fn with_frame_rate(mut self, frame_rate: Option<u32>) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Number of decode threads actually used.
    pub fn worker_count(&self) -> usize {
        self.concurrency.max(1)
    }
}
