pub mod agent;
pub mod chat;
pub mod config;
pub mod converter;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod knowledge_base;
pub mod loader;
pub mod memory;
pub mod models;
pub mod repl;
pub mod requirements;
pub mod splitter;
pub mod store;
pub mod stores;
pub mod tools;

pub use agent::{AgentResponse, AgentStep, RequirementAgent, Respond};
pub use chat::{ChatModel, Message, OllamaChatModel, Role, ToolSpec};
pub use config::{
    AgentConfig, ChatBackend, ChatConfig, EmbeddingBackend, KnowledgeBaseConfig, RagConfig,
    SearchConfig, VectorStoreBackend,
};
pub use converter::{
    convert_batch, convert_batch_summary, discover_pdf_files, DocumentConverter, LopdfConverter,
};
pub use embeddings::{CharacterNgramEmbedder, Embedder, OllamaEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{AgentError, ConfigError, ConvertError, IngestError, StoreError, ToolError};
pub use ingest::{discover_documents, ingest_documents, load_documents, IngestionReport, SkippedDocument};
pub use knowledge_base::{
    build_chat_model, build_embedder, build_tools, create_agent, setup_knowledge_base, KnowledgeBase,
};
pub use loader::{DocumentLoader, MarkdownLoader};
pub use memory::UnconstrainedMemory;
pub use models::{
    ConversionEvent, ConversionFailure, ConversionResult, ConvertedFile, DocumentChunk,
    LoadedDocument, SearchHit,
};
pub use repl::run_repl;
pub use requirements::{ForceAfter, RequirementTracker, ToolName, ToolRequirement};
pub use splitter::{ChunkingConfig, RecursiveCharacterSplitter, TextSplitter};
pub use store::VectorStore;
pub use stores::{InMemoryVectorStore, QdrantStore};
pub use tools::{DuckDuckGoSearchTool, ThinkTool, Tool, VectorStoreSearchTool};
