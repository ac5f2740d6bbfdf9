use std::path::Path;

use image::GrayImage;

use crate::LocatorError;
use crate::pipeline::{canny, resize_to_scale};

/// Reference image searched for by the locator.
#[derive(Debug, Clone)]
pub struct Template {
    image: GrayImage,
}

impl Template {
    /// Loads an image file and converts it to luma.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LocatorError> {
        let image = image::open(path)?.to_luma8();
        Self::from_image(image)
    }

    pub fn from_image(image: GrayImage) -> Result<Self, LocatorError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(LocatorError::EmptyTemplate);
        }
        Ok(Self { image })
    }

    pub fn from_pixels(width: u32, height: u32, data: Vec<u8>) -> Result<Self, LocatorError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(LocatorError::InvalidTemplate {
                reason: format!("expected {expected} bytes for {width}x{height}, got {}", data.len()),
            });
        }
        let image = GrayImage::from_raw(width, height, data).ok_or_else(|| {
            LocatorError::InvalidTemplate {
                reason: format!("buffer does not fit {width}x{height}"),
            }
        })?;
        Self::from_image(image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn scaled(&self, scale: f64) -> Result<GrayImage, LocatorError> {
        resize_to_scale(&self.image, scale)
    }

    /// Canny edges of the template resized by `scale`.
    pub fn scaled_edges(&self, scale: f64, low: f32, high: f32) -> Result<GrayImage, LocatorError> {
        Ok(canny(&self.scaled(scale)?, low, high))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pixels_validates_length() {
        assert!(Template::from_pixels(2, 2, vec![0; 4]).is_ok());
        assert!(matches!(
            Template::from_pixels(2, 2, vec![0; 3]),
            Err(LocatorError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            Template::from_pixels(0, 2, Vec::new()),
            Err(LocatorError::EmptyTemplate)
        ));
    }

    #[test]
    fn scaled_template_changes_size() {
        let template = Template::from_pixels(32, 24, vec![9; 32 * 24]).unwrap();
        assert_eq!(template.scaled(0.5).unwrap().dimensions(), (16, 12));
        assert_eq!(template.scaled(1.0).unwrap().dimensions(), (32, 24));
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = Template::open("/nonexistent/vodcut/pct.png").unwrap_err();
        assert!(matches!(err, LocatorError::Image(_)));
    }
}
