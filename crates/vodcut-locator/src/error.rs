use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("failed to load template image: {0}")]
    Image(#[from] image::ImageError),

    #[error("template has no pixels")]
    EmptyTemplate,

    #[error("invalid template buffer: {reason}")]
    InvalidTemplate { reason: String },

    #[error("scale {scale} must be finite and positive")]
    InvalidScale { scale: f64 },
}
