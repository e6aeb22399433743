//! Model completion backends.

mod http;
mod openai;

pub use http::Auth;
pub use openai::OpenAiBackend;
