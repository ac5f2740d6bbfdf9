use image::GrayImage;
use vodcut_types::{LumaFrame, PixelSpan, Rect};

/// Pixel bounds of `rect` inside `frame`, or `None` when nothing is left after clipping.
pub fn region_span(frame: &LumaFrame, rect: &Rect) -> Option<PixelSpan> {
    let clipped = *rect & frame.shape();
    let span = clipped.pixel_span()?;
    let bottom = span.bottom().min(frame.height() as usize);
    let right = span.right().min(frame.width() as usize);
    if bottom <= span.top || right <= span.left {
        return None;
    }
    Some(PixelSpan {
        top: span.top,
        left: span.left,
        height: bottom - span.top,
        width: right - span.left,
    })
}

/// Copies the pixels of `rect` out of `frame`.
pub fn crop(frame: &LumaFrame, rect: &Rect) -> Option<GrayImage> {
    let span = region_span(frame, rect)?;
    Some(copy_span(frame, &span))
}

/// The whole frame as an owned image, stride padding removed.
pub fn to_image(frame: &LumaFrame) -> GrayImage {
    let span = PixelSpan {
        top: 0,
        left: 0,
        height: frame.height() as usize,
        width: frame.width() as usize,
    };
    copy_span(frame, &span)
}

fn copy_span(frame: &LumaFrame, span: &PixelSpan) -> GrayImage {
    let mut buffer = Vec::with_capacity(span.width * span.height);
    for y in span.top..span.bottom() {
        buffer.extend_from_slice(&frame.row(y)[span.left..span.right()]);
    }
    GrayImage::from_raw(span.width as u32, span.height as u32, buffer)
        .unwrap_or_else(|| GrayImage::new(0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_frame(width: u32, height: u32, stride: usize) -> LumaFrame {
        let mut data = vec![255u8; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                data[y * stride + x] = (y * 10 + x) as u8;
            }
        }
        LumaFrame::from_owned(width, height, stride, None, data).unwrap()
    }

    #[test]
    fn crop_copies_region_and_skips_padding() {
        let frame = numbered_frame(6, 4, 8);
        let image = crop(&frame, &Rect::new(1.0, 2.0, 2.0, 3.0)).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.as_raw(), &vec![12, 13, 14, 22, 23, 24]);
    }

    #[test]
    fn crop_clips_to_frame() {
        let frame = numbered_frame(6, 4, 6);
        let image = crop(&frame, &Rect::new(-2.0, 4.0, 10.0, 10.0)).unwrap();
        assert_eq!(image.dimensions(), (2, 4));
        assert_eq!(image.get_pixel(0, 3)[0], 34);
    }

    #[test]
    fn empty_or_outside_rect_has_no_crop() {
        let frame = numbered_frame(6, 4, 6);
        assert!(crop(&frame, &Rect::new(10.0, 10.0, 3.0, 3.0)).is_none());
        assert!(crop(&frame, &Rect::new(1.0, 1.0, 0.0, 3.0)).is_none());
    }

    #[test]
    fn to_image_drops_stride() {
        let frame = numbered_frame(3, 2, 5);
        assert_eq!(to_image(&frame).as_raw(), &vec![0, 1, 2, 10, 11, 12]);
    }
}
