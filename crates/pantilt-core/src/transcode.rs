//! Row-order conversion between renderer read-back and display consumers.
//!
//! Graphics read-back reports the bottom image row first, display toolkits
//! expect the top row first. Converting between them is a pure row reversal;
//! pixel values are never touched.

use crate::frame::{RowOrder, VirtualFrame};

/// Reverses the row order of `frame` in place.
///
/// Applying this twice restores the original buffer. Empty frames are left
/// untouched.
pub fn flip_rows(frame: &mut VirtualFrame) {
    if frame.is_empty() {
        return;
    }

    let stride = frame.row_stride();
    let height = frame.height() as usize;
    let data = frame.data_mut();

    for top in 0..height / 2 {
        let bottom = height - 1 - top;
        let (head, tail) = data.split_at_mut(bottom * stride);
        head[top * stride..(top + 1) * stride].swap_with_slice(&mut tail[..stride]);
    }

    let order = frame.row_order().flipped();
    frame.set_row_order(order);
}

/// Returns a row-reversed copy of `frame`.
#[must_use]
pub fn flipped(frame: &VirtualFrame) -> VirtualFrame {
    let mut out = frame.clone();
    flip_rows(&mut out);
    out
}

/// Flips `frame` to display order if it is still in read-back order.
///
/// Returns true if the buffer was modified.
pub fn to_top_down(frame: &mut VirtualFrame) -> bool {
    if frame.is_empty() || frame.row_order() == RowOrder::TopDown {
        return false;
    }
    flip_rows(frame);
    true
}
