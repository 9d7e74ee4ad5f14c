//! HTTP plumbing: the JSON response envelope and validated extractors.

mod response;
mod validated;

pub use response::{ApiResponse, CreatedResponse};
pub use validated::ValidatedJson;
