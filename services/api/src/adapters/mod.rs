pub mod assistant_llm;
pub mod db;
pub mod memory;
pub mod metadata_llm;

pub use assistant_llm::OpenAiAssistantAdapter;
pub use db::DbAdapter;
pub use memory::MemoryAdapter;
pub use metadata_llm::OpenAiMetadataAdapter;
