//! Frame annotation: draw found bounding boxes into a captured frame

use crate::errors::ResolverError;
use image::{ImageOutputFormat, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use sightline_core_types::{BoundingBox, Frame, FrameFormat};
use std::io::Cursor;

const ANNOTATION_COLOR: Rgba<u8> = Rgba([0, 200, 0, 255]);

/// Decode `frame`, draw each box, and re-encode as PNG. The original frame
/// is untouched; the annotated copy gets a fresh id.
pub fn annotate_frame(frame: &Frame, boxes: &[BoundingBox]) -> Result<Frame, ResolverError> {
    let decoded = image::load_from_memory(&frame.data)
        .map_err(|e| ResolverError::Annotation(format!("frame decode failed: {e}")))?;
    let mut canvas = decoded.to_rgba8();

    for bbox in boxes {
        let width = (bbox.width.round().max(1.0)) as u32;
        let height = (bbox.height.round().max(1.0)) as u32;
        let rect = Rect::at(bbox.x.round() as i32, bbox.y.round() as i32).of_size(width, height);
        draw_hollow_rect_mut(&mut canvas, rect, ANNOTATION_COLOR);
    }

    let (width, height) = canvas.dimensions();
    let mut encoded = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut encoded), ImageOutputFormat::Png)
        .map_err(|e| ResolverError::Annotation(format!("frame encode failed: {e}")))?;

    Ok(Frame::new(encoded, FrameFormat::Png, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_frame(width: u32, height: u32) -> Frame {
        let canvas = image::RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut data = Vec::new();
        image::DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Png)
            .unwrap();
        Frame::new(data, FrameFormat::Png, width, height)
    }

    #[test]
    fn test_annotation_preserves_dimensions() {
        let frame = blank_frame(64, 48);
        let boxes = vec![BoundingBox::new(5.0, 5.0, 20.0, 10.0)];

        let annotated = annotate_frame(&frame, &boxes).unwrap();
        assert_eq!(annotated.width, 64);
        assert_eq!(annotated.height, 48);
        assert_ne!(annotated.id, frame.id);

        // Output decodes again.
        let reloaded = image::load_from_memory(&annotated.data).unwrap();
        assert_eq!(reloaded.width(), 64);
    }

    #[test]
    fn test_annotation_rejects_garbage() {
        let frame = Frame::new(vec![1, 2, 3], FrameFormat::Png, 1, 1);
        let err = annotate_frame(&frame, &[]).unwrap_err();
        assert!(matches!(err, ResolverError::Annotation(_)));
    }
}
