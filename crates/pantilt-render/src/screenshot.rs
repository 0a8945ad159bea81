//! Writing captured frames to image files.

use std::path::Path;

use image::{ImageBuffer, Rgb, Rgba};

use pantilt_core::{transcode, PantiltError, PixelFormat, RowOrder, VirtualFrame};

/// Error type for screenshot operations.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("Failed to save image: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid image data")]
    InvalidImageData,
}

impl From<ScreenshotError> for PantiltError {
    fn from(err: ScreenshotError) -> Self {
        PantiltError::Sink(err.to_string())
    }
}

/// Converts a frame of any channel order to RGB(A) bytes, top row first.
fn to_rgb_order(frame: &VirtualFrame) -> Vec<u8> {
    let mut owned;
    let frame = if frame.row_order() == RowOrder::TopDown {
        frame
    } else {
        owned = frame.clone();
        transcode::to_top_down(&mut owned);
        &owned
    };

    let mut data = frame.data().to_vec();
    if matches!(frame.format(), PixelFormat::Bgr8 | PixelFormat::Bgra8) {
        for px in data.chunks_exact_mut(frame.format().channels()) {
            px.swap(0, 2); // Swap B and R
        }
    }
    data
}

/// Converts a frame to RGBA8 bytes, top row first, for upload as a texture.
///
/// Formats without alpha come out opaque.
pub fn frame_to_rgba(frame: &VirtualFrame) -> Vec<u8> {
    let data = to_rgb_order(frame);
    if frame.format().has_alpha() {
        return data;
    }
    let mut rgba = Vec::with_capacity(data.len() / 3 * 4);
    for px in data.chunks_exact(3) {
        rgba.extend_from_slice(px);
        rgba.push(u8::MAX);
    }
    rgba
}

/// Saves a frame to an image file (.png, .jpg or .jpeg).
///
/// Bottom-up frames are flipped first, so the file always shows the image
/// the right way up.
pub fn save_image(path: impl AsRef<Path>, frame: &VirtualFrame) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let (width, height) = (frame.width(), frame.height());
    let data = to_rgb_order(frame);
    let image = if frame.format().has_alpha() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, data).ok_or(ScreenshotError::InvalidImageData)?;
        image::DynamicImage::ImageRgba8(img)
    } else {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, data).ok_or(ScreenshotError::InvalidImageData)?;
        image::DynamicImage::ImageRgb8(img)
    };

    match extension.as_str() {
        "png" => {
            image.save_with_format(path, image::ImageFormat::Png)?;
        }
        "jpg" | "jpeg" => {
            // JPEG has no alpha
            image
                .to_rgb8()
                .save_with_format(path, image::ImageFormat::Jpeg)?;
        }
        _ => {
            return Err(ScreenshotError::UnsupportedFormat(extension));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantilt_core::Resolution;

    fn two_row_bgr() -> VirtualFrame {
        // bottom row blue, top row red (BGR order, bottom-up)
        VirtualFrame::from_raw(
            Resolution::new(1, 2).unwrap(),
            PixelFormat::Bgr8,
            RowOrder::BottomUp,
            vec![255, 0, 0, 0, 0, 255],
        )
        .unwrap()
    }

    #[test]
    fn test_rgb_order_flips_and_swaps() {
        let data = to_rgb_order(&two_row_bgr());
        assert_eq!(data, vec![255, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn test_frame_to_rgba_adds_opaque_alpha() {
        assert_eq!(
            frame_to_rgba(&two_row_bgr()),
            vec![255, 0, 0, 255, 0, 0, 255, 255]
        );
    }

    #[test]
    fn test_frame_to_rgba_keeps_alpha() {
        let frame = VirtualFrame::from_raw(
            Resolution::new(1, 1).unwrap(),
            PixelFormat::Bgra8,
            RowOrder::TopDown,
            vec![10, 20, 30, 40],
        )
        .unwrap();
        assert_eq!(frame_to_rgba(&frame), vec![30, 20, 10, 40]);
    }

    #[test]
    fn test_save_and_reload_png() {
        let dir = std::env::temp_dir().join("pantilt-screenshot-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");
        save_image(&path, &two_row_bgr()).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 255]);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = save_image("frame.tga", &two_row_bgr()).unwrap_err();
        assert!(matches!(err, ScreenshotError::UnsupportedFormat(_)));
    }
}
