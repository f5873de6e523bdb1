pub mod image_gen;
pub mod llm;
pub mod search;

pub use image_gen::PollinationsClient;
pub use llm::LlmClient;
pub use search::DuckDuckGoClient;
