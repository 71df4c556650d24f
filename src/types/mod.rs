pub mod analysis_mode;
pub mod bounding_box;
pub mod sub_request;
pub mod time_span;
pub mod traits;
pub mod variable;
