use crate::embeddings::Embedder;
use crate::models::{DocumentChunk, SearchHit};
use crate::store::{cosine_similarity, VectorStore};
use crate::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

struct StoredChunk {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

/// Process-local store. Entries keep insertion order and are never removed.
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredChunk>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn add_documents(&self, chunks: &[DocumentChunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut entries = self.entries.write().await;
        entries.extend(
            chunks
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| StoredChunk { chunk, vector }),
        );
        Ok(())
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, StoreError> {
        if query.trim().is_empty() {
            return Err(StoreError::Request("query is empty".to_string()));
        }

        let query_vector = self.embedder.embed(query).await?;
        let entries = self.entries.read().await;

        let mut scored: Vec<(f64, &StoredChunk)> = entries
            .iter()
            .map(|entry| (cosine_similarity(&query_vector, &entry.vector), entry))
            .collect();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| SearchHit {
                chunk_id: entry.chunk.chunk_id.clone(),
                source_path: entry.chunk.source_path.clone(),
                score,
                source: "memory".to_string(),
                text: entry.chunk.text.clone(),
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;

    fn chunk(id: &str, text: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            source_path: format!("/docs/{id}.md"),
            title: format!("{id}.md"),
            chunk_index: 0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn search_ranks_closest_chunk_first() -> Result<(), StoreError> {
        let store = InMemoryVectorStore::new(Arc::new(CharacterNgramEmbedder::default()));
        store
            .add_documents(&[
                chunk("pump", "hydraulic pump pressure maintenance schedule"),
                chunk("invoice", "quarterly invoice totals for the finance team"),
            ])
            .await?;

        let hits = store.search("hydraulic pump pressure", 1).await?;

        assert_eq!(store.count().await?, 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "pump");
        assert_eq!(hits[0].source, "memory");
        Ok(())
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let store = InMemoryVectorStore::new(Arc::new(CharacterNgramEmbedder::default()));
        assert!(store.search("  ", 3).await.is_err());
    }
}
