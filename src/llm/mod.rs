pub mod invoker;
pub mod parser;
pub mod prompts;

#[cfg(feature = "gemini")]
pub mod client;
#[cfg(feature = "gemini")]
pub mod types;

pub use invoker::*;
pub use parser::*;
pub use prompts::*;

#[cfg(feature = "gemini")]
pub use client::*;
