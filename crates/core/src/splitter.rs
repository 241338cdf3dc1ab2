use crate::error::IngestError;
use crate::models::{DocumentChunk, LoadedDocument};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

pub trait TextSplitter: Send + Sync {
    fn split_text(&self, text: &str) -> Vec<String>;

    fn split_documents(&self, documents: &[LoadedDocument]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (index, text) in self.split_text(&document.text).into_iter().enumerate() {
                let chunk_index = index as u64;
                chunks.push(DocumentChunk {
                    chunk_id: make_chunk_id(&document.source_path, chunk_index, &text),
                    source_path: document.source_path.clone(),
                    title: document.title.clone(),
                    chunk_index,
                    text,
                });
            }
        }
        chunks
    }
}

/// Splits on the coarsest separator present, recursing into pieces that are
/// still too long, then merges neighbours back up to `chunk_size` while
/// keeping roughly `chunk_overlap` characters shared between chunks.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    config: ChunkingConfig,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    pub fn new(config: ChunkingConfig) -> Result<Self, IngestError> {
        config.validate()?;
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (index, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = candidate.clone();
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate.clone();
                remaining = &separators[index + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str())
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut good = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.config.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                final_chunks.extend(self.merge_splits(&good, &separator));
                good.clear();
            }
            if remaining.is_empty() {
                final_chunks.push(piece);
            } else {
                final_chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !good.is_empty() {
            final_chunks.extend(self.merge_splits(&good, &separator));
        }

        final_chunks
    }

    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let separator_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { separator_len }
            };

            if joined_len(&current, total) > self.config.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current, separator);

                while total > self.config.chunk_overlap
                    || (joined_len(&current, total) > self.config.chunk_size && total > 0)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    let sep = if current.is_empty() { 0 } else { separator_len };
                    total = total.saturating_sub(char_len(front) + sep);
                }
            }

            current.push_back(split);
            total += len + if current.len() > 1 { separator_len } else { 0 };
        }

        push_joined(&mut docs, &current, separator);
        docs
    }
}

impl TextSplitter for RecursiveCharacterSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }
}

fn push_joined(docs: &mut Vec<String>, current: &VecDeque<&str>, separator: &str) {
    let joined = current.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn make_chunk_id(source_path: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_path.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> RecursiveCharacterSplitter {
        RecursiveCharacterSplitter::new(ChunkingConfig {
            chunk_size,
            chunk_overlap,
        })
        .expect("valid config")
    }

    fn document(text: &str) -> LoadedDocument {
        LoadedDocument {
            source_path: "/docs/manual.md".to_string(),
            title: "manual.md".to_string(),
            text: text.to_string(),
            loaded_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = splitter(1000, 200).split_text("A short note.\n\nSecond paragraph.");
        assert_eq!(chunks, vec!["A short note.\n\nSecond paragraph."]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(splitter(1000, 200).split_text("   \n\n ").is_empty());
        assert!(splitter(1000, 200).split_documents(&[document("")]).is_empty());
    }

    #[test]
    fn words_are_merged_with_overlap() {
        let chunks = splitter(10, 5).split_text("aaaa bbbb cccc dddd eeee");
        assert_eq!(
            chunks,
            vec!["aaaa bbbb", "bbbb cccc", "cccc dddd", "dddd eeee"]
        );
    }

    #[test]
    fn oversized_words_fall_back_to_characters() {
        let chunks = splitter(4, 1).split_text("abcdefghij");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
    }

    #[test]
    fn long_document_chunks_respect_size() {
        let paragraph = "Hydraulic pressure must be checked before every shift. ".repeat(40);
        let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
        let chunks = splitter(1000, 200).split_text(&text);
        assert!(chunks.len() > 3);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 1000));
    }

    #[test]
    fn split_documents_tags_provenance() {
        let chunks = splitter(10, 5).split_documents(&[document("aaaa bbbb cccc")]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].source_path, "/docs/manual.md");
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(RecursiveCharacterSplitter::new(ChunkingConfig {
            chunk_size: 0,
            chunk_overlap: 0
        })
        .is_err());
        assert!(RecursiveCharacterSplitter::new(ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100
        })
        .is_err());
    }
}
