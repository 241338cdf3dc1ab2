//! Runtime configuration.
//!
//! Values are layered with figment: built-in defaults, then an optional YAML
//! file, then `RAG_AGENT_` environment variables (`__` separates nested keys,
//! e.g. `RAG_AGENT_KNOWLEDGE_BASE__CHUNK_SIZE=800`).

use crate::error::ConfigError;
use crate::requirements::{validate_tool_policy, ForceAfter, ToolName, ToolRequirement};
use crate::splitter::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::tools::web_search::DEFAULT_DUCKDUCKGO_ENDPOINT;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "RAG_AGENT_";

const DEFAULT_INSTRUCTIONS: &str = "You are the Business Knowledge Specialist. Your function is to answer user questions using the organisation's proprietary internal data.

Directives:
1. The knowledge base is authoritative. Prioritise all information retrieved from it; it is the foundational truth for every response.
2. Augment, do not just repeat. Use the retrieved knowledge to directly address the specific scenario or question the user poses.
3. Be precise, factual and confident. Omit hedging language such as \"I think\" or \"It seems\".";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Folder of Markdown files loaded into the knowledge base by `chat`.
    pub docs_dir: PathBuf,
    /// Extension filter for `docs_dir`; `None` takes every file.
    pub docs_extension: Option<String>,
    pub ollama_url: String,
    pub log_level: String,
    pub knowledge_base: KnowledgeBaseConfig,
    pub chat: ChatConfig,
    pub agent: AgentConfig,
    pub search: SearchConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("/app/md_docs"),
            docs_extension: Some("md".to_string()),
            ollama_url: "http://localhost:11434".to_string(),
            log_level: "info".to_string(),
            knowledge_base: KnowledgeBaseConfig::default(),
            chat: ChatConfig::default(),
            agent: AgentConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// `ollama:<model>` or `hash:<dimensions>`.
    pub embedding_model: String,
    /// `memory` or `qdrant:<collection>`.
    pub vector_store: String,
    pub qdrant_url: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_top_k: usize,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            embedding_model: "ollama:nomic-embed-text".to_string(),
            vector_store: "memory".to_string(),
            qdrant_url: "http://localhost:6333".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            retrieval_top_k: 4,
        }
    }
}

impl KnowledgeBaseConfig {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// `ollama:<model>`.
    pub model: String,
    pub temperature: Option<f32>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "ollama:granite3.3".to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub role: String,
    pub instructions: String,
    /// Tools registered with the agent.
    pub tools: Vec<ToolName>,
    /// Tools the instructions tell the agent never to use.
    pub forbidden_tools: Vec<ToolName>,
    pub requirements: Vec<ToolRequirement>,
    /// Upper bound on model calls within one turn.
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            role: "Data knowledge consultant for a business".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            tools: vec![ToolName::Think, ToolName::VectorStoreSearch],
            forbidden_tools: vec![ToolName::WebSearch],
            requirements: vec![
                ToolRequirement::new(ToolName::Think)
                    .force_at_step(1)
                    .force_after(ForceAfter::AnyTool)
                    .consecutive_allowed(false)
                    .max_invocations(3),
                ToolRequirement::new(ToolName::VectorStoreSearch)
                    .min_invocations(1)
                    .force_at_step(2)
                    .consecutive_allowed(false)
                    .max_invocations(2),
            ],
            max_iterations: 12,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "agent.max_iterations",
                details: "must be at least 1".to_string(),
            });
        }
        validate_tool_policy(&self.tools, &self.forbidden_tools, &self.requirements)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DUCKDUCKGO_ENDPOINT.to_string(),
            max_results: 5,
        }
    }
}

impl RagConfig {
    /// Loads defaults, the optional YAML file and the environment, then validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::extract(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Merges the layers without validating them.
    pub fn extract(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(RagConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.knowledge_base
            .chunking()
            .validate()
            .map_err(|error| ConfigError::InvalidChunking(error.to_string()))?;

        if self.knowledge_base.retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "knowledge_base.retrieval_top_k",
                details: "must be at least 1".to_string(),
            });
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.max_results",
                details: "must be at least 1".to_string(),
            });
        }

        EmbeddingBackend::from_name(&self.knowledge_base.embedding_model)?;
        VectorStoreBackend::from_name(&self.knowledge_base.vector_store)?;
        ChatBackend::from_name(&self.chat.model)?;
        self.agent.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Ollama { model: String },
    Hash { dimensions: usize },
}

impl EmbeddingBackend {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let unknown = || ConfigError::UnknownBackend {
            kind: "embedding",
            name: name.to_string(),
        };
        match name.split_once(':') {
            Some(("ollama", model)) if !model.is_empty() => Ok(Self::Ollama {
                model: model.to_string(),
            }),
            Some(("hash", dimensions)) => dimensions
                .parse()
                .ok()
                .filter(|dimensions| *dimensions > 0)
                .map(|dimensions| Self::Hash { dimensions })
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreBackend {
    Memory,
    Qdrant { collection: String },
}

impl VectorStoreBackend {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.split_once(':') {
            None if name == "memory" => Ok(Self::Memory),
            Some(("qdrant", collection)) if !collection.is_empty() => Ok(Self::Qdrant {
                collection: collection.to_string(),
            }),
            _ => Err(ConfigError::UnknownBackend {
                kind: "vector store",
                name: name.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatBackend {
    Ollama { model: String },
}

impl ChatBackend {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.split_once(':') {
            Some(("ollama", model)) if !model.is_empty() => Ok(Self::Ollama {
                model: model.to_string(),
            }),
            _ => Err(ConfigError::UnknownBackend {
                kind: "chat model",
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.knowledge_base.chunk_size, 1000);
        assert_eq!(config.knowledge_base.chunk_overlap, 200);
    }

    #[test]
    fn backend_names_are_parsed() {
        assert_eq!(
            EmbeddingBackend::from_name("ollama:nomic-embed-text").unwrap(),
            EmbeddingBackend::Ollama {
                model: "nomic-embed-text".to_string()
            }
        );
        assert_eq!(
            EmbeddingBackend::from_name("hash:64").unwrap(),
            EmbeddingBackend::Hash { dimensions: 64 }
        );
        assert!(EmbeddingBackend::from_name("hash:0").is_err());
        assert!(EmbeddingBackend::from_name("openai:ada").is_err());
        assert_eq!(
            VectorStoreBackend::from_name("qdrant:docs").unwrap(),
            VectorStoreBackend::Qdrant {
                collection: "docs".to_string()
            }
        );
        assert!(VectorStoreBackend::from_name("beeai:TemporalVectorStore").is_err());
        assert!(ChatBackend::from_name("ollama:").is_err());
    }

    #[test]
    fn enabling_forbidden_search_fails_validation() {
        let mut config = RagConfig::default();
        config.agent.tools.push(ToolName::WebSearch);
        config.agent.requirements.push(
            ToolRequirement::new(ToolName::WebSearch)
                .min_invocations(1)
                .consecutive_allowed(false)
                .max_invocations(2),
        );

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ContradictoryToolPolicy { .. })
        ));

        config.agent.forbidden_tools.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_file_overrides_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rag-agent.yaml");
        std::fs::write(
            &path,
            "docs_dir: /srv/docs\nknowledge_base:\n  chunk_size: 500\n  chunk_overlap: 50\n  embedding_model: hash:64\nagent:\n  max_iterations: 4\n",
        )?;

        let config = RagConfig::load(Some(&path))?;

        assert_eq!(config.docs_dir, PathBuf::from("/srv/docs"));
        assert_eq!(config.knowledge_base.chunk_size, 500);
        assert_eq!(config.knowledge_base.embedding_model, "hash:64");
        assert_eq!(config.knowledge_base.vector_store, "memory");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.requirements.len(), 2);
        Ok(())
    }

    #[test]
    fn extract_defers_validation() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("search.yaml");
        std::fs::write(
            &path,
            "log_level: debug\nagent:\n  tools: [think, vector_store_search, duckduckgo_search]\n",
        )?;

        let config = RagConfig::extract(Some(&path))?;
        assert_eq!(config.log_level, "debug");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ContradictoryToolPolicy { .. })
        ));
        assert!(RagConfig::load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn invalid_overlap_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "knowledge_base:\n  chunk_size: 100\n  chunk_overlap: 100\n")?;

        assert!(matches!(
            RagConfig::load(Some(&path)),
            Err(ConfigError::InvalidChunking(_))
        ));
        Ok(())
    }
}
