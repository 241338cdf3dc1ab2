use crate::error::StoreError;
use crate::loader::DocumentLoader;
use crate::splitter::TextSplitter;
use crate::store::VectorStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Lists the files directly inside `folder` as absolute paths, sorted.
///
/// `extension` filters by extension (case-insensitive, with or without the
/// leading dot). A missing folder is logged and yields an empty list.
pub fn discover_documents(folder: &Path, extension: Option<&str>) -> Vec<PathBuf> {
    if !folder.is_dir() {
        warn!(folder = %folder.display(), "directory not found");
        return Vec::new();
    }

    let wanted = extension.map(|ext| ext.trim_start_matches('.'));
    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| match wanted {
            Some(wanted) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted)),
            None => true,
        })
        .map(|path| path.canonicalize().unwrap_or(path))
        .collect();

    files.sort_unstable();
    files
}

#[derive(Debug, Clone)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    /// Chunk count per successfully loaded file, in input order.
    pub loaded: Vec<(PathBuf, usize)>,
    pub skipped: Vec<SkippedDocument>,
    pub chunk_count: usize,
}

/// Loads, splits and stores every path. Files that fail to load are
/// recorded and skipped; all chunks go to the store in a single call.
pub async fn ingest_documents(
    store: &dyn VectorStore,
    splitter: &dyn TextSplitter,
    loader: &dyn DocumentLoader,
    file_paths: &[PathBuf],
) -> Result<IngestionReport, StoreError> {
    let mut report = IngestionReport::default();
    let mut all_chunks = Vec::new();

    for path in file_paths {
        match loader.load(path).await {
            Ok(documents) => {
                let chunks = splitter.split_documents(&documents);
                info!(path = %path.display(), chunks = chunks.len(), "loaded document");
                report.loaded.push((path.clone(), chunks.len()));
                all_chunks.extend(chunks);
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to load document");
                report.skipped.push(SkippedDocument {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    if !all_chunks.is_empty() {
        store.add_documents(&all_chunks).await?;
        info!(total = all_chunks.len(), backend = store.backend(), "chunks added to vector store");
    }
    report.chunk_count = all_chunks.len();

    Ok(report)
}

/// Ingests `file_paths` and hands the store back only when something was
/// stored.
pub async fn load_documents(
    store: Arc<dyn VectorStore>,
    splitter: &dyn TextSplitter,
    loader: &dyn DocumentLoader,
    file_paths: &[PathBuf],
) -> Result<(Option<Arc<dyn VectorStore>>, IngestionReport), StoreError> {
    let report = ingest_documents(store.as_ref(), splitter, loader, file_paths).await?;
    let populated = (report.chunk_count > 0).then_some(store);
    Ok((populated, report))
}
