//! Knowledge base construction and agent assembly.

use crate::agent::RequirementAgent;
use crate::chat::{ChatModel, OllamaChatModel};
use crate::config::{ChatBackend, EmbeddingBackend, RagConfig, VectorStoreBackend};
use crate::embeddings::{CharacterNgramEmbedder, Embedder, OllamaEmbedder};
use crate::error::{AgentError, ConfigError, IngestError};
use crate::ingest::{load_documents, IngestionReport};
use crate::loader::MarkdownLoader;
use crate::requirements::ToolName;
use crate::splitter::RecursiveCharacterSplitter;
use crate::store::VectorStore;
use crate::stores::{InMemoryVectorStore, QdrantStore};
use crate::tools::{DuckDuckGoSearchTool, ThinkTool, Tool, VectorStoreSearchTool};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct KnowledgeBase {
    pub store: Arc<dyn VectorStore>,
    pub splitter: RecursiveCharacterSplitter,
}

pub fn build_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>, ConfigError> {
    let embedder: Arc<dyn Embedder> =
        match EmbeddingBackend::from_name(&config.knowledge_base.embedding_model)? {
            EmbeddingBackend::Ollama { model } => {
                Arc::new(OllamaEmbedder::new(config.ollama_url.clone(), model))
            }
            EmbeddingBackend::Hash { dimensions } => Arc::new(CharacterNgramEmbedder::new(dimensions)),
        };
    Ok(embedder)
}

/// Builds the embedding model, vector store and splitter named by `config`.
pub fn setup_knowledge_base(config: &RagConfig) -> Result<KnowledgeBase, ConfigError> {
    let embedder = build_embedder(config)?;
    let store: Arc<dyn VectorStore> =
        match VectorStoreBackend::from_name(&config.knowledge_base.vector_store)? {
            VectorStoreBackend::Memory => Arc::new(InMemoryVectorStore::new(embedder.clone())),
            VectorStoreBackend::Qdrant { collection } => Arc::new(QdrantStore::new(
                config.knowledge_base.qdrant_url.clone(),
                collection,
                embedder.clone(),
            )),
        };

    let splitter = RecursiveCharacterSplitter::new(config.knowledge_base.chunking())
        .map_err(|error| ConfigError::InvalidChunking(error.to_string()))?;

    info!(
        embedding_model = embedder.model_name(),
        vector_store = store.backend(),
        chunk_size = config.knowledge_base.chunk_size,
        chunk_overlap = config.knowledge_base.chunk_overlap,
        "knowledge base ready"
    );

    Ok(KnowledgeBase { store, splitter })
}

pub fn build_chat_model(config: &RagConfig) -> Result<Arc<dyn ChatModel>, ConfigError> {
    let model: Arc<dyn ChatModel> = match ChatBackend::from_name(&config.chat.model)? {
        ChatBackend::Ollama { model } => Arc::new(
            OllamaChatModel::new(config.ollama_url.clone(), model)
                .with_temperature(config.chat.temperature),
        ),
    };
    Ok(model)
}

/// Instantiates the tools listed in `config.agent.tools`.
pub fn build_tools(config: &RagConfig, store: Arc<dyn VectorStore>) -> Vec<Arc<dyn Tool>> {
    config
        .agent
        .tools
        .iter()
        .map(|name| -> Arc<dyn Tool> {
            match name {
                ToolName::Think => Arc::new(ThinkTool),
                ToolName::VectorStoreSearch => Arc::new(VectorStoreSearchTool::new(
                    store.clone(),
                    config.knowledge_base.retrieval_top_k,
                )),
                ToolName::WebSearch => Arc::new(DuckDuckGoSearchTool::new(
                    config.search.endpoint.clone(),
                    config.search.max_results,
                )),
            }
        })
        .collect()
}

/// Builds the knowledge base, ingests `file_paths` into it and wires the
/// agent around the populated store. Ingestion finishes before the agent
/// exists.
pub async fn create_agent(
    config: &RagConfig,
    model: Arc<dyn ChatModel>,
    file_paths: &[PathBuf],
) -> Result<(RequirementAgent, IngestionReport), AgentError> {
    config.agent.validate()?;

    let knowledge_base = setup_knowledge_base(config)?;
    let loader = MarkdownLoader::new().map_err(|error: IngestError| ConfigError::InvalidValue {
        field: "loader",
        details: error.to_string(),
    })?;

    let (populated, report) = load_documents(
        knowledge_base.store,
        &knowledge_base.splitter,
        &loader,
        file_paths,
    )
    .await?;
    let Some(store) = populated else {
        return Err(AgentError::EmptyKnowledgeBase(report));
    };

    let tools = build_tools(config, store);
    let agent = RequirementAgent::new(model, tools, &config.agent)?;
    Ok((agent, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Message, ToolSpec};
    use crate::requirements::ToolRequirement;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::tempdir;

    struct EchoModel;

    #[async_trait]
    impl ChatModel for EchoModel {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message, AgentError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(Message::assistant(format!("echo: {last}")))
        }
    }

    fn offline_config() -> RagConfig {
        let mut config = RagConfig::default();
        config.knowledge_base.embedding_model = "hash:64".to_string();
        config.agent.requirements.clear();
        config
    }

    #[test]
    fn default_knowledge_base_uses_memory_store() {
        let kb = setup_knowledge_base(&RagConfig::default()).unwrap();
        assert_eq!(kb.store.backend(), "memory");
        assert_eq!(kb.splitter.config().chunk_size, 1000);
        assert_eq!(kb.splitter.config().chunk_overlap, 200);
    }

    #[test]
    fn qdrant_backend_is_selected_by_name() {
        let mut config = RagConfig::default();
        config.knowledge_base.vector_store = "qdrant:business_docs".to_string();
        let kb = setup_knowledge_base(&config).unwrap();
        assert_eq!(kb.store.backend(), "qdrant");
    }

    #[test]
    fn tools_follow_config_order() {
        let mut config = RagConfig::default();
        config.agent.tools.push(ToolName::WebSearch);
        let kb = setup_knowledge_base(&offline_config()).unwrap();
        let names: Vec<_> = build_tools(&config, kb.store).iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![ToolName::Think, ToolName::VectorStoreSearch, ToolName::WebSearch]
        );
    }

    #[tokio::test]
    async fn create_agent_ingests_before_answering() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let doc = dir.path().join("policy.md");
        fs::write(&doc, "# Returns\n\nReturns are accepted for 30 days.")?;

        let (mut agent, report) = create_agent(&offline_config(), Arc::new(EchoModel), &[doc]).await?;
        assert_eq!(report.chunk_count, 1);

        let response = agent.run("hello").await?;
        assert_eq!(response.text, "echo: hello");
        Ok(())
    }

    #[tokio::test]
    async fn create_agent_without_documents_fails() {
        let result = create_agent(&offline_config(), Arc::new(EchoModel), &[]).await;
        assert!(matches!(result, Err(AgentError::EmptyKnowledgeBase(_))));
    }

    #[tokio::test]
    async fn empty_knowledge_base_reports_failed_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let binary = dir.path().join("scan.md");
        fs::write(&binary, [0xff, 0xfe])?;
        let missing = dir.path().join("gone.md");

        let result =
            create_agent(&offline_config(), Arc::new(EchoModel), &[binary.clone(), missing.clone()])
                .await;

        let Err(AgentError::EmptyKnowledgeBase(report)) = result else {
            panic!("expected an empty knowledge base");
        };
        assert_eq!(report.chunk_count, 0);
        assert!(report.loaded.is_empty());
        let skipped: Vec<_> = report.skipped.iter().map(|s| s.path.clone()).collect();
        assert_eq!(skipped, vec![binary, missing]);
        Ok(())
    }

    #[tokio::test]
    async fn contradictory_policy_is_rejected_before_ingestion() {
        let mut config = offline_config();
        config.agent.tools.push(ToolName::WebSearch);
        config
            .agent
            .requirements
            .push(ToolRequirement::new(ToolName::WebSearch).min_invocations(1));

        let result = create_agent(&config, Arc::new(EchoModel), &[]).await;
        assert!(matches!(
            result,
            Err(AgentError::Config(ConfigError::ContradictoryToolPolicy { .. }))
        ));
    }
}
