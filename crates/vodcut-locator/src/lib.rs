//! Template search over luma frames.
//!
//! [`TemplateLocator`] runs a zero-mean normalized cross-correlation of a
//! [`Template`] over sampled frames at several scales and reports where, and at
//! which scale, the template shows up. The lower-level image operations live in
//! [`pipeline`].

mod error;
pub mod locator;
pub mod pipeline;
pub mod template;

pub use error::LocatorError;
pub use locator::{Located, LocatorSettings, TemplateLocator};
pub use pipeline::{CorrelationMap, Peak, canny, ccoeff_normed, crop, find_peaks, resize_to_scale};
pub use template::Template;
pub use vodcut_types::Location;

#[cfg(test)]
mod tests;
