// Service exports
pub mod memory;
pub mod openai;
pub mod postgres;
pub mod store;
pub mod text;

pub use memory::MemoryStore;
pub use openai::OpenAiClient;
pub use postgres::PostgresStore;
pub use store::{FruitStore, StoreError};
pub use text::{CompletionRequest, DisabledGenerator, GenerationError, TextGenerator};
