//! Recursive-separator chunker producing overlapping, contiguous passages.
//!
//! Chunks are literal substrings of the source text: concatenating them
//! while skipping each chunk's leading `chunk_overlap` characters
//! reproduces the document exactly. Cut points prefer a paragraph break,
//! then a line break, then a space, and only fall back to a hard cut at
//! the size limit when no separator lands inside the window.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { size: config.chunk_size, overlap: config.chunk_overlap })
    }

    /// Split every document. Output order is input document order, then
    /// left-to-right within each document; stable across runs.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for doc in documents {
            self.split_document(doc, &mut chunks);
        }
        chunks
    }

    fn split_document(&self, doc: &Document, out: &mut Vec<Chunk>) {
        // Char-indexed view so size and overlap count characters, not bytes.
        let byte_of: Vec<usize> = doc.text.char_indices().map(|(b, _)| b).collect();
        let n = byte_of.len();
        if n == 0 {
            return;
        }

        let byte_at = |char_idx: usize| {
            if char_idx < n { byte_of[char_idx] } else { doc.text.len() }
        };

        let mut start = 0usize;
        let mut chunk_index = 0usize;
        loop {
            let end = if n - start <= self.size {
                n
            } else {
                self.cut_point(&doc.text, &byte_of, n, start)
            };
            out.push(Chunk {
                id: Chunk::chunk_id(&doc.source, doc.page, start, end),
                source: doc.source.clone(),
                page: doc.page,
                offset: start,
                text: doc.text[byte_at(start)..byte_at(end)].to_string(),
                chunk_index,
            });
            chunk_index += 1;
            if end == n {
                break;
            }
            // Next chunk re-reads the tail of this one.
            start = end - self.overlap;
        }
    }

    /// Best cut in `(start, start + size]`: the end of the last separator
    /// occurrence inside the window, by separator priority. A cut must
    /// land past `start + overlap`, otherwise the next chunk's start
    /// would not advance.
    fn cut_point(&self, text: &str, byte_of: &[usize], n: usize, start: usize) -> usize {
        let limit = start + self.size; // caller guarantees limit < n
        let min_cut = start + self.overlap;
        let window = &text[byte_of[start]..byte_of[limit.min(n)]];
        for sep in SEPARATORS {
            if let Some(pos) = window.rfind(sep) {
                // Separators are ASCII, so byte length equals char count.
                let cut = start + window[..pos].chars().count() + sep.len();
                if cut > min_cut {
                    return cut;
                }
            }
        }
        limit
    }
}
