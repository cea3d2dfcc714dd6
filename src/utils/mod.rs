//! Shared helpers.

pub mod json_extraction;
pub mod template;

pub use json_extraction::{find_matching_brace, try_extract_json_object, JsonExtractionResult};
pub use template::render_template;
