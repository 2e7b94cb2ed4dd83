//! Hierarchical overlap chunker.
//!
//! Splits document text into chunks of at most `chunk_size` characters.
//! Each window ends at the best separator available inside it — paragraph
//! break first, then line break, then sentence end, then word boundary,
//! falling back to a hard character cut. The next window starts exactly
//! `chunk_overlap` characters before the previous end, so consecutive
//! chunks from the same document always share `chunk_overlap` characters;
//! only the final chunk may be shorter than `chunk_size`.
//!
//! All sizes are in characters, not bytes. Cuts never land inside a
//! multi-byte UTF-8 sequence.

use crate::models::{Chunk, Document};

/// Separator classes in preference order. A later class is only consulted
/// when no usable boundary from an earlier class exists in the window.
const PARAGRAPH: &[&str] = &["\n\n"];
const LINE: &[&str] = &["\n"];
const SENTENCE: &[&str] = &[". ", "! ", "? "];
const WORD: &[&str] = &[" "];

/// Split every document into overlapping chunks, preserving document order.
/// Chunk indices restart at 0 for each document. An empty document list
/// yields an empty chunk list, and documents with no non-whitespace content
/// contribute no chunks.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for doc in documents {
        for (i, text) in split_text(&doc.content, chunk_size, chunk_overlap)
            .into_iter()
            .enumerate()
        {
            chunks.push(Chunk {
                text,
                source: doc.source.clone(),
                page: doc.page,
                chunk_index: i,
            });
        }
    }
    chunks
}

/// Split one text into overlapping pieces of at most `chunk_size` chars.
///
/// Text without any non-whitespace content yields no pieces. Config
/// validation already requires `chunk_overlap < chunk_size`; direct calls
/// with out-of-range sizes are clamped so the scan always advances: a zero
/// `chunk_size` returns the whole text as one piece, and an overlap of
/// `chunk_size` or more is reduced to `chunk_size - 1`.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if chunk_size == 0 {
        return vec![text.to_string()];
    }
    let chunk_overlap = chunk_overlap.min(chunk_size - 1);

    // Byte offset of every char, plus a sentinel at the end, so slicing by
    // char position is O(1) and always lands on a boundary.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(text.len()))
        .collect();
    let n = offsets.len() - 1;

    if n <= chunk_size {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;

    loop {
        if n - start <= chunk_size {
            pieces.push(text[offsets[start]..offsets[n]].to_string());
            break;
        }

        let hard_end = start + chunk_size;
        // A boundary closer to the window start than this would move the
        // next window backwards past the current start.
        let min_end = start + chunk_overlap + 1;
        let end = find_boundary(text, &offsets, start, hard_end, min_end);

        pieces.push(text[offsets[start]..offsets[end]].to_string());
        start = end - chunk_overlap;
    }

    pieces
}

/// Pick the cut position for the window `[start, hard_end)`, in char units.
///
/// Tries each separator class in order and takes the last occurrence whose
/// boundary (the position just after the separator) is at least `min_end`.
/// Falls back to `hard_end` when no separator qualifies.
fn find_boundary(
    text: &str,
    offsets: &[usize],
    start: usize,
    hard_end: usize,
    min_end: usize,
) -> usize {
    let window = &text[offsets[start]..offsets[hard_end]];

    for class in [PARAGRAPH, LINE, SENTENCE, WORD] {
        let mut best: Option<usize> = None;
        for sep in class {
            if let Some(pos) = window.rfind(sep) {
                let boundary_byte = offsets[start] + pos + sep.len();
                // Map the byte offset back to a char position.
                let boundary = offsets.partition_point(|&b| b < boundary_byte);
                if boundary >= min_end && boundary <= hard_end {
                    best = Some(best.map_or(boundary, |b: usize| b.max(boundary)));
                }
            }
        }
        if let Some(boundary) = best {
            return boundary;
        }
    }

    hard_end
}
