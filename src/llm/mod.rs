pub mod backend;
pub mod client;
pub mod gemini;
pub mod prompt;
pub mod secrets;
pub mod sse;
pub mod validate;

pub use client::generate;
pub use gemini::GeminiClient;
pub use secrets::{clear_api_key, store_api_key};
