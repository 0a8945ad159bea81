//! Consumers of captured gimbal frames.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pantilt_core::{FrameSink, PantiltError, Resolution, Result, VirtualFrame};

/// Discards frames, counting them.
#[derive(Debug, Default)]
pub struct NullSink {
    presented: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames received.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for NullSink {
    fn present(&mut self, _tick: u64, _frame: &VirtualFrame) -> Result<()> {
        self.presented += 1;
        Ok(())
    }
}

/// Keeps copies of received frames in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: VecDeque<(u64, VirtualFrame)>,
    limit: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most the `limit` most recent frames.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            limit: Some(limit),
        }
    }

    /// Received frames with their tick indices, oldest first.
    pub fn frames(&self) -> &VecDeque<(u64, VirtualFrame)> {
        &self.frames
    }

    /// Tick indices of the received frames.
    pub fn ticks(&self) -> Vec<u64> {
        self.frames.iter().map(|(tick, _)| *tick).collect()
    }

    pub fn into_frames(self) -> Vec<(u64, VirtualFrame)> {
        self.frames.into()
    }
}

impl FrameSink for RecordingSink {
    fn present(&mut self, tick: u64, frame: &VirtualFrame) -> Result<()> {
        if let Some(limit) = self.limit {
            if limit == 0 {
                return Ok(());
            }
            while self.frames.len() >= limit {
                self.frames.pop_front();
            }
        }
        self.frames.push_back((tick, frame.clone()));
        Ok(())
    }
}

/// The latest gimbal frame as top-down RGBA8, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub tick: u64,
    pub size: Resolution,
    pub rgba: Vec<u8>,
}

/// Shared slot holding the newest frame a [`PreviewSink`] received.
#[derive(Debug, Clone, Default)]
pub struct PreviewHandle(Arc<Mutex<Option<PreviewImage>>>);

impl PreviewHandle {
    /// Takes the pending image, leaving the slot empty.
    pub fn take(&self) -> Option<PreviewImage> {
        self.0.lock().ok().and_then(|mut guard| guard.take())
    }

    fn put(&self, image: PreviewImage) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = Some(image);
        }
    }
}

/// Converts frames for live display and leaves the newest one in a
/// [`PreviewHandle`]. Frames not taken before the next one arrives are
/// dropped.
#[derive(Debug, Default)]
pub struct PreviewSink {
    handle: PreviewHandle,
    presented: u64,
}

impl PreviewSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the display side reads from.
    pub fn handle(&self) -> PreviewHandle {
        self.handle.clone()
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameSink for PreviewSink {
    fn present(&mut self, tick: u64, frame: &VirtualFrame) -> Result<()> {
        let Some(size) = frame.resolution() else {
            return Ok(());
        };
        self.handle.put(PreviewImage {
            tick,
            size,
            rgba: pantilt_render::frame_to_rgba(frame),
        });
        self.presented += 1;
        Ok(())
    }
}

/// Forwards every frame to each of its sinks in order, stopping at the
/// first error.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: impl FrameSink + 'static) -> Self {
        self.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn FrameSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FrameSink for FanoutSink {
    fn present(&mut self, tick: u64, frame: &VirtualFrame) -> Result<()> {
        for sink in &mut self.sinks {
            sink.present(tick, frame)?;
        }
        Ok(())
    }
}

/// Writes every `stride`-th received frame as an image file.
///
/// Files are named `frame_<tick>.png` (six digits, zero padded) inside a
/// session directory created under the given root.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
    stride: u64,
    extension: &'static str,
    received: u64,
    written: u64,
}

impl ImageSequenceSink {
    /// Creates `<root>/session_<YYYYmmdd_HHMMSS>` and writes PNG files into it.
    pub fn new(root: impl AsRef<Path>, stride: u64) -> Result<Self> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = root.as_ref().join(format!("session_{timestamp}"));
        Self::in_dir(dir, stride)
    }

    /// Writes into `dir` as-is, creating it if needed.
    pub fn in_dir(dir: impl Into<PathBuf>, stride: u64) -> Result<Self> {
        if stride == 0 {
            return Err(PantiltError::InvalidOption {
                name: "stride",
                reason: "must be at least 1".to_string(),
            });
        }
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        log::info!("writing gimbal frames to {}", dir.display());
        Ok(Self {
            dir,
            stride,
            extension: "png",
            received: 0,
            written: 0,
        })
    }

    /// Writes JPEG instead of PNG.
    #[must_use]
    pub fn jpeg(mut self) -> Self {
        self.extension = "jpg";
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of files written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Path a frame captured on `tick` is written to.
    pub fn frame_path(&self, tick: u64) -> PathBuf {
        self.dir.join(format!("frame_{tick:06}.{}", self.extension))
    }
}

impl FrameSink for ImageSequenceSink {
    fn present(&mut self, tick: u64, frame: &VirtualFrame) -> Result<()> {
        let index = self.received;
        self.received += 1;
        if index % self.stride != 0 {
            return Ok(());
        }
        let path = self.frame_path(tick);
        pantilt_render::save_image(&path, frame)?;
        self.written += 1;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantilt_core::{PixelFormat, Resolution, RowOrder};

    fn frame(value: u8) -> VirtualFrame {
        let res = Resolution::new(2, 2).unwrap();
        VirtualFrame::from_raw(res, PixelFormat::Bgr8, RowOrder::TopDown, vec![value; 12]).unwrap()
    }

    #[test]
    fn test_null_sink_counts() {
        let mut sink = NullSink::new();
        sink.present(0, &frame(1)).unwrap();
        sink.present(2, &frame(1)).unwrap();
        assert_eq!(sink.presented(), 2);
    }

    #[test]
    fn test_recording_sink_copies() {
        let mut sink = RecordingSink::new();
        let mut f = frame(1);
        sink.present(0, &f).unwrap();
        f.data_mut().fill(9);
        sink.present(2, &f).unwrap();

        assert_eq!(sink.ticks(), vec![0, 2]);
        assert!(sink.frames()[0].1.data().iter().all(|&b| b == 1));
        assert!(sink.frames()[1].1.data().iter().all(|&b| b == 9));
    }

    #[test]
    fn test_recording_sink_limit() {
        let mut sink = RecordingSink::with_limit(2);
        for tick in [0, 2, 4] {
            sink.present(tick, &frame(0)).unwrap();
        }
        assert_eq!(sink.ticks(), vec![2, 4]);
    }

    #[test]
    fn test_recording_sink_limit_keeps_newest_over_long_runs() {
        let mut sink = RecordingSink::with_limit(3);
        for tick in 0..1000u64 {
            #[allow(clippy::cast_possible_truncation)]
            sink.present(tick, &frame(tick as u8)).unwrap();
        }
        let frames = sink.into_frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].0, 997);
        assert_eq!(frames[2].0, 999);
        assert!(frames[2].1.data().iter().all(|&b| b == 231));
    }

    #[test]
    fn test_recording_sink_zero_limit_keeps_nothing() {
        let mut sink = RecordingSink::with_limit(0);
        sink.present(0, &frame(0)).unwrap();
        assert!(sink.into_frames().is_empty());
    }

    #[test]
    fn test_preview_sink_keeps_latest_rgba() {
        let mut sink = PreviewSink::new();
        let handle = sink.handle();
        assert!(handle.take().is_none());

        // BGR (10, 20, 30) is RGB (30, 20, 10)
        let res = Resolution::new(2, 1).unwrap();
        let first = VirtualFrame::from_raw(
            res,
            PixelFormat::Bgr8,
            RowOrder::TopDown,
            vec![1, 1, 1, 1, 1, 1],
        )
        .unwrap();
        let second = VirtualFrame::from_raw(
            res,
            PixelFormat::Bgr8,
            RowOrder::TopDown,
            vec![10, 20, 30, 10, 20, 30],
        )
        .unwrap();
        sink.present(0, &first).unwrap();
        sink.present(2, &second).unwrap();

        let image = handle.take().unwrap();
        assert_eq!(image.tick, 2);
        assert_eq!(image.size, res);
        assert_eq!(image.rgba, vec![30, 20, 10, 255, 30, 20, 10, 255]);
        assert!(handle.take().is_none());
        assert_eq!(sink.presented(), 2);
    }

    #[test]
    fn test_preview_sink_skips_empty_frames() {
        let mut sink = PreviewSink::new();
        sink.present(0, &VirtualFrame::empty(PixelFormat::Bgr8))
            .unwrap();
        assert!(sink.handle().take().is_none());
        assert_eq!(sink.presented(), 0);
    }

    struct Failing;

    impl FrameSink for Failing {
        fn present(&mut self, _tick: u64, _frame: &VirtualFrame) -> Result<()> {
            Err(PantiltError::Sink("disk full".to_string()))
        }
    }

    #[test]
    fn test_fanout_forwards_to_every_sink() {
        let preview = PreviewSink::new();
        let handle = preview.handle();
        let mut fanout = FanoutSink::new().with(preview).with(NullSink::new());
        assert_eq!(fanout.len(), 2);

        fanout.present(4, &frame(7)).unwrap();
        assert_eq!(handle.take().map(|image| image.tick), Some(4));
    }

    #[test]
    fn test_fanout_stops_at_first_error() {
        let preview = PreviewSink::new();
        let handle = preview.handle();
        let mut fanout = FanoutSink::new().with(Failing).with(preview);

        assert!(matches!(
            fanout.present(0, &frame(1)),
            Err(PantiltError::Sink(_))
        ));
        assert!(handle.take().is_none());
    }

    #[test]
    fn test_image_sequence_stride_and_names() {
        let dir = std::env::temp_dir().join("pantilt-sink-tests").join("stride");
        let _ = std::fs::remove_dir_all(&dir);
        let mut sink = ImageSequenceSink::in_dir(&dir, 2).unwrap();

        for tick in [0, 2, 4, 6] {
            sink.present(tick, &frame(128)).unwrap();
        }

        assert_eq!(sink.written(), 2);
        assert!(dir.join("frame_000000.png").exists());
        assert!(!dir.join("frame_000002.png").exists());
        assert!(dir.join("frame_000004.png").exists());

        let img = image::open(dir.join("frame_000004.png")).unwrap();
        assert_eq!(img.width(), 2);
        assert_eq!(img.height(), 2);
    }

    #[test]
    fn test_image_sequence_writes_jpeg() {
        let dir = std::env::temp_dir().join("pantilt-sink-tests").join("jpeg");
        let _ = std::fs::remove_dir_all(&dir);
        let mut sink = ImageSequenceSink::in_dir(&dir, 1).unwrap().jpeg();

        sink.present(8, &frame(200)).unwrap();

        let path = sink.frame_path(8);
        assert_eq!(path, dir.join("frame_000008.jpg"));
        assert_eq!(sink.written(), 1);
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (2, 2));
        // lossy, but a flat gray survives closely
        assert!(img.pixels().all(|p| p.0.iter().all(|&c| c.abs_diff(200) <= 8)));
    }

    #[test]
    fn test_image_sequence_rejects_zero_stride() {
        let dir = std::env::temp_dir().join("pantilt-sink-tests").join("zero");
        assert!(ImageSequenceSink::in_dir(dir, 0).is_err());
    }

    #[test]
    fn test_session_directory_is_timestamped() {
        let root = std::env::temp_dir().join("pantilt-sink-tests").join("sessions");
        let sink = ImageSequenceSink::new(&root, 1).unwrap();
        let name = sink.dir().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("session_"));
        assert_eq!(name.len(), "session_".len() + 15);
    }
}
