//! Overlapping sliding-window text chunker.
//!
//! Splits extracted document text into [`Chunk`]s of at most `chunk_size`
//! characters, where consecutive chunks share `overlap` characters. Chunk
//! text is an exact slice of the input, so the original text can always be
//! rebuilt from the chunks and their offsets.
//!
//! # Algorithm
//!
//! 1. Start a window at character `start` with a hard end of
//!    `start + chunk_size` (clamped to the text length).
//! 2. If the window does not reach the end of the text, pull its end back
//!    to just after the last newline, or failing that the last whitespace,
//!    in the second half of the window.
//! 3. Emit the chunk and restart at `end - overlap`.
//! 4. Stop once a chunk reaches the end of the text.
//!
//! Offsets count Unicode scalar values, never bytes, so multi-byte text is
//! never split inside a character.
//!
//! # Example
//!
//! ```rust
//! use ragify_core::chunk::{chunk_text, ChunkParams};
//!
//! let params = ChunkParams::new(800, 80).unwrap();
//! let chunks = chunk_text("doc-123", "Hello world.\n\nSecond paragraph.", &params);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_index, 0);
//! ```

use sha2::{Digest, Sha256};

use crate::error::ChunkParamsError;
use crate::models::Chunk;

/// Validated chunk size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Requires `chunk_size > overlap`, which also rules out a zero size.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkParamsError> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(ChunkParamsError {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Split `text` into overlapping chunks.
///
/// # Guarantees
///
/// - Empty text yields no chunks.
/// - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
/// - The first chunk starts at 0, the last ends at the text length, and
///   each chunk starts exactly `overlap` characters before the previous end.
/// - Only the last chunk may be shorter than the snapping window allows.
/// - Output depends only on the inputs.
pub fn chunk_text(document_id: &str, text: &str, params: &ChunkParams) -> Vec<Chunk> {
    // bounds[i] is the byte offset of character i; the final entry is text.len().
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    if total == 0 {
        return chunks;
    }

    let mut start = 0;
    loop {
        let hard_end = (start + params.chunk_size).min(total);
        let end = if hard_end < total {
            let floor = (start + params.overlap + 1).max(start + params.chunk_size / 2);
            snap_end(text, &bounds, floor, hard_end)
        } else {
            hard_end
        };

        let slice = &text[bounds[start]..bounds[end]];
        chunks.push(make_chunk(document_id, chunks.len(), slice, start, end));

        if end == total {
            break;
        }
        start = end - params.overlap;
    }

    chunks
}

/// Pick the chunk end in `floor..=hard_end`: after a newline if possible,
/// else after any whitespace, else `hard_end`.
fn snap_end(text: &str, bounds: &[usize], floor: usize, hard_end: usize) -> usize {
    let char_before = |pos: usize| text[bounds[pos - 1]..bounds[pos]].chars().next();

    let find = |pred: &dyn Fn(char) -> bool| {
        (floor..=hard_end)
            .rev()
            .find(|&pos| pos > 0 && char_before(pos).is_some_and(pred))
    };

    find(&|c: char| c == '\n')
        .or_else(|| find(&|c: char| c.is_whitespace()))
        .unwrap_or(hard_end)
}

fn make_chunk(document_id: &str, index: usize, text: &str, start: usize, end: usize) -> Chunk {
    Chunk {
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        start,
        end,
        hash: hex::encode(Sha256::digest(text.as_bytes())),
    }
}

/// Rebuild the original text from chunks produced by [`chunk_text`].
///
/// Each chunk contributes only the characters past the previous chunk's end.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered: usize = 0;
    for c in chunks {
        let skip = covered.saturating_sub(c.start);
        out.extend(c.text.chars().skip(skip));
        covered = covered.max(c.end);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, overlap: usize) -> ChunkParams {
        ChunkParams::new(size, overlap).unwrap()
    }

    #[test]
    fn test_params_validation() {
        assert!(ChunkParams::new(0, 0).is_err());
        assert!(ChunkParams::new(10, 10).is_err());
        assert!(ChunkParams::new(10, 11).is_err());
        assert!(ChunkParams::new(10, 9).is_ok());
        assert!(ChunkParams::new(1, 0).is_ok());
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("doc1", "", &params(100, 10)).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("doc1", "Hello, world!", &params(800, 80));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 13));
    }

    #[test]
    fn test_overlap_between_neighbours() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text("doc1", text, &params(10, 3));
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start, pair[0].end - 3);
            let tail: String = pair[0].text.chars().skip(pair[0].text.chars().count() - 3).collect();
            assert!(pair[1].text.starts_with(&tail));
        }
        assert!(chunks.last().unwrap().text.len() <= 10);
    }

    #[test]
    fn test_reassemble_reconstructs_text() {
        let text = (0..40)
            .map(|i| format!("Sentence number {} talks about warranty terms.", i))
            .collect::<Vec<_>>()
            .join(" \n");
        for (size, overlap) in [(50, 0), (50, 10), (120, 40), (7, 6), (1, 0)] {
            let chunks = chunk_text("doc1", &text, &params(size, overlap));
            assert_eq!(reassemble(&chunks), text, "size={} overlap={}", size, overlap);
            assert_eq!(chunks.first().unwrap().start, 0);
            assert_eq!(chunks.last().unwrap().end, text.chars().count());
        }
    }

    #[test]
    fn test_chunk_sizes_bounded() {
        let text = "word ".repeat(500);
        let chunks = chunk_text("doc1", &text, &params(64, 8));
        for c in &chunks {
            assert!(c.text.chars().count() <= 64);
            assert_eq!(c.text.chars().count(), c.end - c.start);
        }
    }

    #[test]
    fn test_snaps_to_whitespace() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = chunk_text("doc1", text, &params(20, 0));
        for c in &chunks[..chunks.len() - 1] {
            assert!(c.text.ends_with(' '), "chunk {:?} should end at a word break", c.text);
        }
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = "x".repeat(1000);
        let chunks = chunk_text("doc1", &text, &params(100, 25));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i, "Index mismatch at position {}", i);
            assert_eq!(c.document_id, "doc1");
        }
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let chunks = chunk_text("doc1", text, &params(9, 2));
        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        let c1 = chunk_text("doc1", text, &params(8, 2));
        let c2 = chunk_text("doc1", text, &params(8, 2));
        assert_eq!(c1, c2);
        assert_eq!(c1[0].entry_id(), c2[0].entry_id());
    }
}
