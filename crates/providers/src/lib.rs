pub mod echo;
pub mod openai_compat;
pub mod registry;
pub(crate) mod util;

// Re-exports for convenience.
pub use echo::EchoAgent;
pub use openai_compat::OpenAiCompatAgent;
pub use registry::build_agent;
