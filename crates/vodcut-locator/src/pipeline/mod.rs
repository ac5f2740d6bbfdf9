pub mod correlation;
pub mod ops;
pub mod preprocess;

pub use correlation::{CorrelationMap, Peak, ccoeff_normed, find_peaks};
pub use ops::{canny, resize_to_scale};
pub use preprocess::crop;
