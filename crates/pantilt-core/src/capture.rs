//! Alternating capture of the gimbal camera view.
//!
//! On even ticks the scene is rendered from the gimbal camera into an
//! offscreen buffer and read back; every tick the host renders the main view
//! to the primary target afterwards.

use crate::camera::CameraPose;
use crate::error::Result;
use crate::frame::{PixelFormat, Resolution, RowOrder, VirtualFrame};
use crate::mechanism::MechanismModel;

/// Destination of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The host window (or its headless stand-in).
    Primary,
    /// The gimbal camera's offscreen buffer.
    Offscreen,
}

/// The render engine as seen by the capture loop.
pub trait SceneRenderer {
    /// Mirrors the mechanism's current body poses into the drawn scene.
    ///
    /// Called once per tick after integration and before any render.
    fn sync_mechanism(&mut self, _mechanism: &MechanismModel) {}

    /// Shows or hides the gimbal camera's frustum visualization.
    fn set_frustum_visible(&mut self, visible: bool);

    /// Sets the active viewport size.
    fn set_size(&mut self, size: Resolution) -> Result<()>;

    /// Returns the active viewport size.
    fn size(&self) -> Resolution;

    /// Renders the scene from `pose` into `target` at the active size.
    fn render(&mut self, pose: &CameraPose, target: RenderTarget) -> Result<()>;

    /// Reads the offscreen buffer back into `frame`.
    ///
    /// Rows are written bottom row first. The frame arrives tagged
    /// [`RowOrder::BottomUp`] and already has the offscreen size.
    fn read_pixels(&mut self, frame: &mut VirtualFrame) -> Result<()>;
}

/// Consumer of finished gimbal camera frames.
pub trait FrameSink {
    /// Presents a frame captured on `tick`.
    ///
    /// The frame is only borrowed; sinks that keep it must copy it before
    /// returning.
    fn present(&mut self, tick: u64, frame: &VirtualFrame) -> Result<()>;
}

/// Monotonic tick counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickCounter(u64);

impl TickCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick index.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Advances to the next tick.
    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

/// Decides when to capture the gimbal camera and performs the capture.
#[derive(Debug, Clone)]
pub struct CaptureScheduler {
    counter: TickCounter,
    resolution: Resolution,
    format: PixelFormat,
}

impl CaptureScheduler {
    #[must_use]
    pub fn new(resolution: Resolution, format: PixelFormat) -> Self {
        Self {
            counter: TickCounter::new(),
            resolution,
            format,
        }
    }

    /// Returns true on even ticks, including tick zero.
    #[must_use]
    pub fn should_capture_virtual(tick: u64) -> bool {
        tick % 2 == 0
    }

    /// Whether the current tick is a capture tick.
    #[must_use]
    pub fn capture_due(&self) -> bool {
        Self::should_capture_virtual(self.counter.get())
    }

    /// The current tick index.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.counter.get()
    }

    /// Advances to the next tick.
    pub fn advance(&mut self) {
        self.counter.advance();
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Renders the gimbal camera view into `frame`.
    ///
    /// The frustum visualization is hidden for the duration of the offscreen
    /// pass and shown again afterwards, also when the pass fails. The
    /// renderer is left at the offscreen size; the caller must restore the
    /// primary size before rendering the main view.
    ///
    /// The frame is tagged [`RowOrder::BottomUp`] before the read, matching
    /// the read-back convention; a reader that produces top-down rows must
    /// retag it.
    pub fn capture<R: SceneRenderer + ?Sized>(
        &self,
        renderer: &mut R,
        pose: &CameraPose,
        frame: &mut VirtualFrame,
    ) -> Result<()> {
        frame.reshape(self.resolution, self.format);

        renderer.set_frustum_visible(false);
        let rendered = renderer
            .set_size(self.resolution)
            .and_then(|()| renderer.render(pose, RenderTarget::Offscreen));
        renderer.set_frustum_visible(true);
        rendered?;

        frame.set_row_order(RowOrder::BottomUp);
        renderer.read_pixels(frame)?;
        log::debug!(
            "captured gimbal frame {} at tick {}",
            self.resolution,
            self.counter.get()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Lens;
    use crate::error::PantiltError;
    use crate::frame::RowOrder;
    use glam::Mat4;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Frustum(bool),
        Size(Resolution),
        Render(RenderTarget),
        Read,
    }

    struct Recorder {
        calls: Vec<Call>,
        size: Resolution,
        fail_render: bool,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                size: Resolution::new(8, 8).unwrap(),
                fail_render: false,
            }
        }
    }

    impl SceneRenderer for Recorder {
        fn set_frustum_visible(&mut self, visible: bool) {
            self.calls.push(Call::Frustum(visible));
        }

        fn set_size(&mut self, size: Resolution) -> Result<()> {
            self.size = size;
            self.calls.push(Call::Size(size));
            Ok(())
        }

        fn size(&self) -> Resolution {
            self.size
        }

        fn render(&mut self, _pose: &CameraPose, target: RenderTarget) -> Result<()> {
            self.calls.push(Call::Render(target));
            if self.fail_render {
                return Err(PantiltError::Render("device lost".into()));
            }
            Ok(())
        }

        fn read_pixels(&mut self, frame: &mut VirtualFrame) -> Result<()> {
            self.calls.push(Call::Read);
            frame.data_mut().fill(7);
            Ok(())
        }
    }

    fn pose() -> CameraPose {
        CameraPose::new(Mat4::IDENTITY, Lens::default())
    }

    #[test]
    fn test_parity() {
        assert!(CaptureScheduler::should_capture_virtual(0));
        assert!(!CaptureScheduler::should_capture_virtual(1));
        assert!(CaptureScheduler::should_capture_virtual(2));
        assert!(!CaptureScheduler::should_capture_virtual(u64::MAX));
    }

    #[test]
    fn test_capture_sequence() {
        let res = Resolution::new(4, 3).unwrap();
        let scheduler = CaptureScheduler::new(res, PixelFormat::Bgr8);
        let mut renderer = Recorder::new();
        let mut frame = VirtualFrame::empty(PixelFormat::Rgb8);

        scheduler.capture(&mut renderer, &pose(), &mut frame).unwrap();

        assert_eq!(
            renderer.calls,
            vec![
                Call::Frustum(false),
                Call::Size(res),
                Call::Render(RenderTarget::Offscreen),
                Call::Frustum(true),
                Call::Read,
            ]
        );
        assert_eq!(frame.resolution(), Some(res));
        assert_eq!(frame.format(), PixelFormat::Bgr8);
        assert!(frame.data().iter().all(|&b| b == 7));
    }

    #[test]
    fn test_capture_tags_bottom_up_rows() {
        let res = Resolution::new(2, 2).unwrap();
        let scheduler = CaptureScheduler::new(res, PixelFormat::Rgb8);
        let mut renderer = Recorder::new();
        // left top-down by a previous consumer
        let mut frame = VirtualFrame::new(res, PixelFormat::Rgb8);
        frame.set_row_order(RowOrder::TopDown);

        scheduler.capture(&mut renderer, &pose(), &mut frame).unwrap();

        assert_eq!(frame.row_order(), RowOrder::BottomUp);
    }

    #[test]
    fn test_failed_render_restores_frustum() {
        let scheduler = CaptureScheduler::new(Resolution::new(2, 2).unwrap(), PixelFormat::Rgb8);
        let mut renderer = Recorder::new();
        renderer.fail_render = true;
        let mut frame = VirtualFrame::empty(PixelFormat::Rgb8);

        let result = scheduler.capture(&mut renderer, &pose(), &mut frame);

        assert!(result.is_err());
        assert_eq!(renderer.calls.last(), Some(&Call::Frustum(true)));
        assert!(!renderer.calls.contains(&Call::Read));
    }

    #[test]
    fn test_counter_advances() {
        let mut scheduler = CaptureScheduler::new(Resolution::new(1, 1).unwrap(), PixelFormat::Rgb8);
        assert!(scheduler.capture_due());
        scheduler.advance();
        assert_eq!(scheduler.tick(), 1);
        assert!(!scheduler.capture_due());
    }

    proptest! {
        #[test]
        fn half_the_ticks_capture(n in 0u64..10_000) {
            let captures = (0..n).filter(|&t| CaptureScheduler::should_capture_virtual(t)).count() as u64;
            prop_assert_eq!(captures, n.div_ceil(2));
        }
    }
}
