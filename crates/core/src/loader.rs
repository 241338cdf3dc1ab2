use crate::error::IngestError;
use crate::models::LoadedDocument;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::path::Path;

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>, IngestError>;
}

/// Loads a Markdown file as plain text, dropping markup that carries no
/// meaning for retrieval.
pub struct MarkdownLoader {
    heading: Regex,
    image: Regex,
    link: Regex,
    emphasis: Regex,
    inline_code: Regex,
    comment: Regex,
    blank_runs: Regex,
}

impl MarkdownLoader {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            heading: Regex::new(r"(?m)^\s{0,3}#{1,6}\s+")?,
            image: Regex::new(r"!\[([^\]]*)\]\([^)]*\)")?,
            link: Regex::new(r"\[([^\]]+)\]\([^)]*\)")?,
            emphasis: Regex::new(r"\*{1,3}([^*\n]+)\*{1,3}")?,
            inline_code: Regex::new(r"`([^`\n]+)`")?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            blank_runs: Regex::new(r"\n{3,}")?,
        })
    }

    pub fn to_plain_text(&self, markdown: &str) -> String {
        let without_fences = markdown
            .lines()
            .filter(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");

        let text = self.comment.replace_all(&without_fences, "");
        let text = self.heading.replace_all(&text, "");
        let text = self.image.replace_all(&text, "$1");
        let text = self.link.replace_all(&text, "$1");
        let text = self.emphasis.replace_all(&text, "$1");
        let text = self.inline_code.replace_all(&text, "$1");
        let text = self.blank_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

#[async_trait]
impl DocumentLoader for MarkdownLoader {
    async fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>, IngestError> {
        let bytes = tokio::fs::read(path).await?;
        let markdown = String::from_utf8(bytes)
            .map_err(|error| IngestError::Encoding(format!("{}: {error}", path.display())))?;

        let title = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;

        Ok(vec![LoadedDocument {
            source_path: path.to_string_lossy().to_string(),
            title: title.to_string(),
            text: self.to_plain_text(&markdown),
            loaded_at: Utc::now(),
        }])
    }
}
