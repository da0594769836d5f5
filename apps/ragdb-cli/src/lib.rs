//! Corpus loading for the CLI: one `Document` per `.txt` file under a
//! directory, source = path relative to the corpus root. Deterministic
//! (sorted) order so index builds are reproducible.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use ragdb_core::types::Document;

pub fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("txt"))
        .collect();
    files.sort();
    files
}

/// Load every `.txt` file under `root`. Errors when the directory holds
/// no text files at all; unreadable single files fail the load rather
/// than being skipped silently.
pub fn load_documents(root: &Path) -> Result<Vec<Document>> {
    let files = list_txt_files(root);
    if files.is_empty() {
        bail!("no .txt files found under {}", root.display());
    }
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let source = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        documents.push(Document::new(source, 0, text));
    }
    Ok(documents)
}
