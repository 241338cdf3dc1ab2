use crate::ingest::IngestionReport;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Input path '{0}' is not a valid directory or does not exist.")]
    InputNotDirectory(PathBuf),

    #[error("Could not create output directory '{path}'. Details: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize document converter. Details: {0}")]
    ConverterInit(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid utf-8: {0}")]
    Encoding(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for tool {tool}: {details}")]
    InvalidArguments { tool: String, details: String },

    #[error("tool {tool} failed: {details}")]
    Execution { tool: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("chat model request failed: {0}")]
    Model(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model called unknown or disallowed tool `{0}`")]
    UnknownTool(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("agent did not produce an answer within {0} iterations")]
    IterationsExhausted(usize),

    /// Carries the ingestion report so callers can show which files failed.
    #[error("no documents were ingested, the knowledge base is empty")]
    EmptyKnowledgeBase(IngestionReport),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AgentError {
    /// Human-readable explanation printed by the chat loop when a turn fails.
    pub fn explain(&self) -> String {
        let hint = match self {
            AgentError::Model(_) | AgentError::Http(_) => {
                "Check that the chat model server is running and the model is pulled."
            }
            AgentError::UnknownTool(_) => {
                "The model requested a tool that is not available at this step."
            }
            AgentError::Tool(_) => "A tool invocation failed; the turn was aborted.",
            AgentError::IterationsExhausted(_) => {
                "The tool requirements could not be satisfied; try rephrasing the question."
            }
            AgentError::EmptyKnowledgeBase(_) => "Add Markdown documents to the source folder.",
            AgentError::Config(_) => "Fix the agent configuration and restart.",
            AgentError::Store(_) => "The vector store could not be queried.",
        };
        format!("Agent error: {self}\n{hint}")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("unknown {kind} backend `{name}`")]
    UnknownBackend { kind: &'static str, name: String },

    #[error("invalid chunking config: {0}")]
    InvalidChunking(String),

    #[error("invalid value for {field}: {details}")]
    InvalidValue { field: &'static str, details: String },

    #[error("contradictory tool policy for `{tool}`: {details}")]
    ContradictoryToolPolicy { tool: String, details: String },

    #[error("requirement references tool `{0}` which is not enabled")]
    UnknownRequirementTool(String),
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        ConfigError::Load(Box::new(value))
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
