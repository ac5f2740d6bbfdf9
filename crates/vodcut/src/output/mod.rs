mod error;
mod json;

pub use error::OutputError;
pub use json::{report_to_json, write_report};
