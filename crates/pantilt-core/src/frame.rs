//! Pixel buffers produced by the gimbal camera.

use serde::{Deserialize, Serialize};

use crate::error::{PantiltError, Result};

/// A validated image size in pixels.
///
/// Both dimensions are strictly positive. Construction is the only place a
/// size is checked, so a bad configured resolution fails before the first
/// render rather than during it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[u32; 2]", into = "[u32; 2]")]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Default gimbal camera resolution.
    pub const DEFAULT_VIRTUAL: Resolution = Resolution {
        width: 640,
        height: 640,
    };

    /// Default primary window resolution.
    pub const DEFAULT_PRIMARY: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// Creates a resolution, rejecting zero-sized dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PantiltError::InvalidResolution { width, height });
        }
        Ok(Self { width, height })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(self) -> u32 {
        self.height
    }

    /// Width divided by height.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl TryFrom<[u32; 2]> for Resolution {
    type Error = PantiltError;

    fn try_from(value: [u32; 2]) -> Result<Self> {
        Self::new(value[0], value[1])
    }
}

impl From<Resolution> for [u32; 2] {
    fn from(value: Resolution) -> Self {
        [value.width, value.height]
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Channel layout of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit red, green, blue.
    Rgb8,
    /// 8-bit blue, green, red (the layout most display toolkits expect).
    #[default]
    Bgr8,
    /// 8-bit red, green, blue, alpha.
    Rgba8,
    /// 8-bit blue, green, red, alpha.
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }

    /// Returns true if this format carries an alpha channel.
    #[must_use]
    pub fn has_alpha(self) -> bool {
        self.channels() == 4
    }

    /// Repacks a row of RGBA8 pixels into this format.
    ///
    /// `dst` must hold exactly `src.len() / 4` pixels of this format.
    pub fn pack_rgba_row(self, src: &[u8], dst: &mut [u8]) {
        let n = self.channels();
        debug_assert_eq!(src.len() / 4 * n, dst.len());
        for (px, out) in src.chunks_exact(4).zip(dst.chunks_exact_mut(n)) {
            match self {
                PixelFormat::Rgb8 => out.copy_from_slice(&px[..3]),
                PixelFormat::Bgr8 => {
                    out[0] = px[2];
                    out[1] = px[1];
                    out[2] = px[0];
                }
                PixelFormat::Rgba8 => out.copy_from_slice(px),
                PixelFormat::Bgra8 => {
                    out[0] = px[2];
                    out[1] = px[1];
                    out[2] = px[0];
                    out[3] = px[3];
                }
            }
        }
    }
}

/// Which image row comes first in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowOrder {
    /// First row is the bottom of the image (graphics read-back convention).
    #[default]
    BottomUp,
    /// First row is the top of the image (display convention).
    TopDown,
}

impl RowOrder {
    /// The opposite ordering.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            RowOrder::BottomUp => RowOrder::TopDown,
            RowOrder::TopDown => RowOrder::BottomUp,
        }
    }
}

/// A row-major pixel buffer captured from the gimbal camera.
///
/// One frame is allocated up front and overwritten on every capture tick;
/// [`VirtualFrame::reshape`] keeps the allocation when the size is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    row_order: RowOrder,
    data: Vec<u8>,
}

impl VirtualFrame {
    /// Creates a zero-filled frame.
    #[must_use]
    pub fn new(resolution: Resolution, format: PixelFormat) -> Self {
        let mut frame = Self::empty(format);
        frame.reshape(resolution, format);
        frame
    }

    /// Creates a frame with no pixels.
    #[must_use]
    pub fn empty(format: PixelFormat) -> Self {
        Self {
            width: 0,
            height: 0,
            format,
            row_order: RowOrder::default(),
            data: Vec::new(),
        }
    }

    /// Wraps an existing buffer.
    ///
    /// # Errors
    /// Returns [`PantiltError::FrameSizeMismatch`] if `data` does not hold
    /// exactly `width * height` pixels of `format`.
    pub fn from_raw(
        resolution: Resolution,
        format: PixelFormat,
        row_order: RowOrder,
        data: Vec<u8>,
    ) -> Result<Self> {
        let expected = resolution.pixel_count() * format.channels();
        if data.len() != expected {
            let actual_pixels = data.len() / format.channels();
            return Err(PantiltError::FrameSizeMismatch {
                expected_width: resolution.width(),
                expected_height: resolution.height(),
                actual_width: u32::try_from(actual_pixels).unwrap_or(u32::MAX),
                actual_height: 1,
            });
        }
        Ok(Self {
            width: resolution.width(),
            height: resolution.height(),
            format,
            row_order,
            data,
        })
    }

    /// Resizes the buffer in place for a new size or format.
    pub fn reshape(&mut self, resolution: Resolution, format: PixelFormat) {
        self.width = resolution.width();
        self.height = resolution.height();
        self.format = format;
        self.data
            .resize(resolution.pixel_count() * format.channels(), 0);
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The frame size, or `None` for an empty frame.
    #[must_use]
    pub fn resolution(&self) -> Option<Resolution> {
        Resolution::new(self.width, self.height).ok()
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    /// Tags the buffer with the row order it was written in.
    pub fn set_row_order(&mut self, row_order: RowOrder) {
        self.row_order = row_order;
    }

    /// Bytes per row.
    #[must_use]
    pub fn row_stride(&self) -> usize {
        self.width as usize * self.format.channels()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns one row of pixels in buffer order.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[u8]> {
        let stride = self.row_stride();
        self.data.get(index * stride..(index + 1) * stride)
    }

    /// Returns one mutable row of pixels in buffer order.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let stride = self.row_stride();
        self.data.get_mut(index * stride..(index + 1) * stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_rejects_zero() {
        assert!(matches!(
            Resolution::new(0, 640),
            Err(PantiltError::InvalidResolution {
                width: 0,
                height: 640
            })
        ));
        assert!(Resolution::new(640, 0).is_err());
        assert!(Resolution::new(640, 640).is_ok());
    }

    #[test]
    fn test_resolution_deserialize_validates() {
        let ok: Resolution = serde_json::from_str("[640, 480]").unwrap();
        assert_eq!(ok.width(), 640);
        assert_eq!(ok.height(), 480);
        assert!(serde_json::from_str::<Resolution>("[0, 640]").is_err());
        assert!(serde_json::from_str::<Resolution>("[-1, 640]").is_err());
    }

    #[test]
    fn test_pack_rgba_row() {
        let src = [10, 20, 30, 255, 40, 50, 60, 128];
        let mut bgr = [0u8; 6];
        PixelFormat::Bgr8.pack_rgba_row(&src, &mut bgr);
        assert_eq!(bgr, [30, 20, 10, 60, 50, 40]);

        let mut rgb = [0u8; 6];
        PixelFormat::Rgb8.pack_rgba_row(&src, &mut rgb);
        assert_eq!(rgb, [10, 20, 30, 40, 50, 60]);

        let mut bgra = [0u8; 8];
        PixelFormat::Bgra8.pack_rgba_row(&src, &mut bgra);
        assert_eq!(bgra, [30, 20, 10, 255, 60, 50, 40, 128]);
    }

    #[test]
    fn test_reshape_reuses_buffer() {
        let res = Resolution::new(4, 2).unwrap();
        let mut frame = VirtualFrame::empty(PixelFormat::Rgb8);
        assert!(frame.is_empty());
        assert!(frame.resolution().is_none());

        frame.reshape(res, PixelFormat::Rgb8);
        assert_eq!(frame.data().len(), 4 * 2 * 3);
        assert_eq!(frame.row_stride(), 12);

        let ptr = frame.data().as_ptr();
        frame.reshape(res, PixelFormat::Rgb8);
        assert_eq!(frame.data().as_ptr(), ptr);
    }

    #[test]
    fn test_from_raw_checks_length() {
        let res = Resolution::new(2, 2).unwrap();
        assert!(VirtualFrame::from_raw(res, PixelFormat::Rgba8, RowOrder::TopDown, vec![0; 16]).is_ok());
        assert!(VirtualFrame::from_raw(res, PixelFormat::Rgba8, RowOrder::TopDown, vec![0; 12]).is_err());
    }
}
