//! Fixed-size overlapping text chunker.
//!
//! Splits document body text into windows of `size` characters that overlap
//! by `overlap` characters, so the tail of each chunk is repeated at the head
//! of the next. Windows are measured in characters, never bytes, so chunk
//! boundaries always fall on UTF-8 character boundaries.
//!
//! Each chunk receives a deterministic id derived from its document key,
//! index, and text; re-chunking an unchanged document yields identical ids.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Split text into overlapping chunks of `size` characters.
///
/// Requires `overlap < size` (enforced at config load). Empty input yields
/// an empty sequence, not an error. Returned chunks carry contiguous indices
/// starting at 0 and together cover the full text: concatenating the first
/// chunk with each following chunk minus its leading `overlap` characters
/// reconstructs the input.
pub fn chunk_text(document_key: &str, text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    debug_assert!(overlap < size, "chunk overlap must be smaller than chunk size");
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character, plus the end sentinel, so windows can
    // be sliced without re-walking the string.
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    offsets.push(text.len());
    let total_chars = offsets.len() - 1;

    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    loop {
        let end = (start + size).min(total_chars);
        let piece = &text[offsets[start]..offsets[end]];
        chunks.push(make_chunk(document_key, index, piece));
        index += 1;

        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}

fn make_chunk(document_key: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(document_key.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    let id = format!("{:x}", hasher.finalize());

    Chunk {
        id,
        document_key: document_key.to_string(),
        chunk_index: index,
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunks = chunk_text("file:a.txt", "", 500, 50);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("file:a.txt", "Decision: use X because Y.", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Decision: use X because Y.");
    }

    #[test]
    fn test_windows_overlap() {
        // size=10, overlap=4 => step=6
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunk_text("doc", text, 10, 4);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "ghijklmnop");
        // Tail of each chunk equals head of the next
        for pair in chunks.windows(2) {
            let tail: String = pair[0].text.chars().rev().take(4).collect::<Vec<_>>()
                .into_iter().rev().collect();
            let head: String = pair[1].text.chars().take(4).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn test_reconstruction() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        for (size, overlap) in [(50, 10), (100, 0), (37, 36), (1000, 100)] {
            let chunks = chunk_text("doc", &text, size, overlap);
            let mut rebuilt = String::new();
            for (i, chunk) in chunks.iter().enumerate() {
                if i == 0 {
                    rebuilt.push_str(&chunk.text);
                } else {
                    rebuilt.extend(chunk.text.chars().skip(overlap));
                }
            }
            assert_eq!(rebuilt, text, "size={} overlap={}", size, overlap);
        }
    }

    #[test]
    fn test_indices_contiguous() {
        let text = "x".repeat(5000);
        let chunks = chunk_text("doc", &text, 1000, 100);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[test]
    fn test_multibyte_boundaries() {
        // Characters wider than one byte must not be split mid-codepoint.
        let text = "héllø wörld ünïcode tèxt".repeat(10);
        let chunks = chunk_text("doc", &text, 7, 3);
        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(&chunk.text);
            } else {
                rebuilt.extend(chunk.text.chars().skip(3));
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    #[should_panic(expected = "overlap must be smaller")]
    fn test_overlap_equal_to_size_asserts() {
        chunk_text("doc", "short", 10, 10);
    }

    #[test]
    fn test_deterministic_ids() {
        let text = "Alpha beta gamma delta epsilon.".repeat(30);
        let a = chunk_text("doc", &text, 100, 20);
        let b = chunk_text("doc", &text, 100, 20);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
        }
        // Different document key changes ids
        let c = chunk_text("other", &text, 100, 20);
        assert_ne!(a[0].id, c[0].id);
    }
}
