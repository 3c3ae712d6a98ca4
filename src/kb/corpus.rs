//! Corpus loading and chunking.
//!
//! Turns a directory of text documents into deterministic, addressable chunks.
//! Chunk ids are stable across runs as long as document order and chunking
//! parameters are unchanged — the index build relies on this.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// File extensions loaded from the corpus directory.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 512;
/// Default characters shared between consecutive windows.
pub const DEFAULT_OVERLAP: usize = 50;

#[derive(Debug, Error)]
pub enum KbError {
    /// Chunking parameters that would not terminate. Fatal at configuration
    /// time, not per-document.
    #[error("invalid chunking parameters: overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidConfig { chunk_size: usize, overlap: usize },
}

/// A source document. The corpus directory is the source of truth; documents
/// are read-only to the rest of the system.
#[derive(Debug, Clone)]
pub struct Document {
    pub relative_path: String,
    pub content: String,
}

/// A bounded substring of a document plus provenance — the unit of indexing
/// and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_path: String,
}

/// Load all `.txt` and `.md` documents under `corpus_dir`, sorted by path so
/// chunk ids are deterministic. Unreadable files are skipped with a warning.
pub fn load_documents(corpus_dir: &Path) -> Vec<Document> {
    let mut docs = Vec::new();

    for entry in WalkDir::new(corpus_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext));
        if !is_text {
            continue;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let relative_path = path
                    .strip_prefix(corpus_dir)
                    .unwrap_or(path)
                    .to_string_lossy()
                    .into_owned();
                docs.push(Document {
                    relative_path,
                    content,
                });
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable corpus file");
            }
        }
    }

    info!(count = docs.len(), dir = %corpus_dir.display(), "loaded corpus documents");
    docs
}

/// Split documents into overlapping character windows.
///
/// Windows advance by `chunk_size - overlap` characters, so consecutive chunks
/// of a document share `overlap` characters and cover the full text with no
/// gaps. Ids are `doc{doc_idx}_chunk{n}` with `n` a running counter across the
/// whole document set.
pub fn chunk_documents(
    documents: &[Document],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, KbError> {
    if overlap >= chunk_size {
        return Err(KbError::InvalidConfig {
            chunk_size,
            overlap,
        });
    }
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut chunk_count = 0usize;

    for (doc_idx, doc) in documents.iter().enumerate() {
        // Window by characters, not bytes, so multi-byte text never splits
        // mid-character.
        let chars: Vec<char> = doc.content.chars().collect();
        let mut start = 0usize;
        while start < chars.len() {
            let end = (start + chunk_size).min(chars.len());
            chunks.push(Chunk {
                id: format!("doc{doc_idx}_chunk{chunk_count}"),
                text: chars[start..end].iter().collect(),
                source_path: doc.relative_path.clone(),
            });
            chunk_count += 1;
            start += step;
        }
    }

    info!(chunks = chunks.len(), documents = documents.len(), "chunked corpus");
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, content: &str) -> Document {
        Document {
            relative_path: path.into(),
            content: content.into(),
        }
    }

    #[test]
    fn empty_document_set_yields_no_chunks() {
        let chunks = chunk_documents(&[], 512, 50).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunks = chunk_documents(&[doc("a.txt", "")], 512, 50).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn overlap_ge_chunk_size_is_invalid_config() {
        let docs = [doc("a.txt", "hello")];
        assert!(matches!(
            chunk_documents(&docs, 50, 50),
            Err(KbError::InvalidConfig { .. })
        ));
        assert!(matches!(
            chunk_documents(&docs, 50, 60),
            Err(KbError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn thousand_char_document_window_count() {
        // step = 512 - 50 = 462; windows start at 0, 462, 924
        let content = "x".repeat(1000);
        let chunks = chunk_documents(&[doc("a.txt", &content)], 512, 50).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 512);
        assert_eq!(chunks[1].text.len(), 512);
        assert_eq!(chunks[2].text.len(), 76);

        let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3, "chunk ids must be unique");
    }

    #[test]
    fn consecutive_windows_share_overlap() {
        let content: String = ('a'..='z').cycle().take(600).collect();
        let chunks = chunk_documents(&[doc("a.txt", &content)], 100, 20).unwrap();

        let first: Vec<char> = chunks[0].text.chars().collect();
        let second: Vec<char> = chunks[1].text.chars().collect();
        assert_eq!(&first[80..], &second[..20]);
    }

    #[test]
    fn chunk_ids_are_deterministic() {
        let docs = [doc("a.txt", &"a".repeat(700)), doc("b.md", &"b".repeat(300))];
        let first = chunk_documents(&docs, 512, 50).unwrap();
        let second = chunk_documents(&docs, 512, 50).unwrap();

        let ids_a: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
        let ids_b: Vec<_> = second.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(first[0].id, "doc0_chunk0");
        assert!(first.last().unwrap().id.starts_with("doc1_"));
    }

    #[test]
    fn at_least_one_chunk_per_nonempty_document() {
        let docs = [doc("a.txt", "tiny"), doc("b.txt", ""), doc("c.md", "also tiny")];
        let chunks = chunk_documents(&docs, 512, 50).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source_path, "a.txt");
        assert_eq!(chunks[1].source_path, "c.md");
    }

    #[test]
    fn multibyte_content_windows_on_char_boundaries() {
        let content = "é".repeat(120);
        let chunks = chunk_documents(&[doc("a.txt", &content)], 100, 10).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 100);
        assert_eq!(chunks[1].text.chars().count(), 30);
    }

    #[test]
    fn load_skips_unrecognized_extensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "text file").unwrap();
        std::fs::write(tmp.path().join("b.md"), "markdown file").unwrap();
        std::fs::write(tmp.path().join("c.bin"), [0u8, 1, 2]).unwrap();

        let docs = load_documents(tmp.path());
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| !d.relative_path.ends_with(".bin")));
    }

    #[test]
    fn load_walks_subdirectories_in_sorted_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub").join("nested.md"), "nested").unwrap();
        std::fs::write(tmp.path().join("top.txt"), "top").unwrap();

        let docs = load_documents(tmp.path());
        assert_eq!(docs.len(), 2);
        let paths: Vec<_> = docs.iter().map(|d| d.relative_path.as_str()).collect();
        assert!(paths.contains(&"sub/nested.md"));
        assert!(paths.contains(&"top.txt"));
    }
}
