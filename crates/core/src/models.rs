use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Structured outcome of one batch conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionResult {
    pub converted_count: usize,
    pub converted: Vec<ConvertedFile>,
    pub errors: Vec<ConversionFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertedFile {
    pub source: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversionFailure {
    pub file_name: String,
    pub reason: String,
}

impl ConversionFailure {
    pub fn message(&self) -> String {
        format!("Error converting {}: {}", self.file_name, self.reason)
    }
}

impl ConversionResult {
    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }

    /// Renders the multi-line report printed at the end of a batch.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "\nBatch conversion complete. Successfully converted {} PDF file(s) into Markdown.",
            self.converted_count
        );
        if !self.errors.is_empty() {
            summary.push_str(&format!(
                "\n--- Warnings: {} file(s) failed to convert. ---",
                self.errors.len()
            ));
            for (index, failure) in self.errors.iter().enumerate() {
                summary.push_str(&format!("\n  {}. {}", index + 1, failure.message()));
            }
        }
        summary
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum ConversionEvent {
    Started { input: PathBuf, output: PathBuf },
    Converted { source_name: String, output_name: String },
    Failed(ConversionFailure),
}

/// Text loaded from one source file, before splitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedDocument {
    pub source_path: String,
    pub title: String,
    pub text: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub source_path: String,
    pub title: String,
    pub chunk_index: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub source_path: String,
    pub score: f64,
    pub source: String,
    pub text: String,
}
