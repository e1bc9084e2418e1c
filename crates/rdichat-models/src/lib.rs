// Models module - data structures for API communication
pub mod types;
pub mod requests;
pub mod responses;


// Re-export commonly used types
pub use types::{ModelChoice, Message, deserialize_string_or_null};
pub use requests::ChatRequest;
pub use responses::{ChatResponse, Choice, Usage};
