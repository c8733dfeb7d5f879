//! Boundary-aware character chunking with overlap.
//!
//! `semchunk_rs` produces the base chunks, counting characters rather than tokens. It prefers the
//! longest run of line breaks, then whitespace after sentence-ending punctuation, then plain
//! whitespace, and cuts hard only when a span has no usable separator.
//!
//! A second pass adds overlap: every chunk after the first is prefixed with the tail of its
//! predecessor, made of whole words when any fit. Base chunks are sized so that tail, joiner and
//! chunk always fit inside `chunk_size`.
//!
//! Sizes are counted in `char`s, never bytes.

use semchunk_rs::Chunker;
use thiserror::Error;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1600;
/// Default overlap between adjacent chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Widest joiner placed between an overlap tail and the next chunk (`"\n\n"`).
const MAX_JOINER_CHARS: usize = 2;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A zero-sized window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new text in every window.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap {
        /// Requested chunk size.
        chunk_size: usize,
        /// Requested overlap.
        overlap: usize,
    },
}

/// Split `text` into ordered, overlapping chunks of at most `chunk_size` characters.
///
/// Returns an empty vector when the input is empty or all whitespace. The output is a pure
/// function of the inputs.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkingError::InvalidOverlap {
            chunk_size,
            overlap,
        });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chunker = Chunker::new(
        base_chunk_size(chunk_size, overlap),
        Box::new(|segment: &str| count_chars(segment)),
    );
    let base_chunks: Vec<String> = chunker
        .chunk(text)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect();
    let joiners = boundary_joiners(text, &base_chunks);
    let chunks = apply_overlap(&base_chunks, &joiners, chunk_size, overlap);

    tracing::trace!(chunks = chunks.len(), chunk_size, overlap, "Split text");
    Ok(chunks)
}

fn count_chars(segment: &str) -> usize {
    segment.chars().count()
}

/// Budget for base chunks, leaving room for the overlap tail and its joiner. Never below 1.
fn base_chunk_size(chunk_size: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return chunk_size;
    }
    let room = chunk_size - overlap;
    room - MAX_JOINER_CHARS.min(room - 1)
}

/// Joiner for each base chunk: the separator the text had between it and its predecessor,
/// reduced to a paragraph break, a line break, a space, or nothing after a hard cut.
fn boundary_joiners(text: &str, chunks: &[String]) -> Vec<&'static str> {
    let mut joiners = Vec::with_capacity(chunks.len());
    let mut cursor = 0;
    let mut previous_end = None;

    for (index, chunk) in chunks.iter().enumerate() {
        let located = text[cursor..]
            .find(chunk.as_str())
            .map(|offset| cursor + offset);
        let joiner = match (index, previous_end, located) {
            (0, _, _) => "",
            (_, Some(end), Some(start)) => joiner_for(&text[end..start]),
            _ => " ",
        };
        joiners.push(joiner);

        previous_end = located.map(|start| start + chunk.len());
        if let Some(end) = previous_end {
            cursor = end;
        }
    }

    joiners
}

fn joiner_for(gap: &str) -> &'static str {
    if gap.is_empty() {
        ""
    } else if gap.contains("\n\n") {
        "\n\n"
    } else if gap.contains('\n') {
        "\n"
    } else {
        " "
    }
}

/// Prefix every chunk after the first with up to `overlap` characters from its predecessor.
fn apply_overlap(
    chunks: &[String],
    joiners: &[&str],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    if overlap == 0 {
        return chunks.to_vec();
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<&str> = None;
    for (chunk, joiner) in chunks.iter().zip(joiners) {
        let next = match previous {
            Some(previous) => build_overlapped_chunk(previous, chunk, joiner, overlap, chunk_size),
            None => chunk.clone(),
        };
        overlapped.push(next);
        previous = Some(chunk.as_str());
    }
    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    joiner: &str,
    overlap: usize,
    chunk_size: usize,
) -> String {
    let room = chunk_size.saturating_sub(count_chars(current) + count_chars(joiner));
    let tail = overlap_tail(previous, overlap.min(room));
    if tail.is_empty() {
        return current.to_string();
    }

    let mut combined = String::with_capacity(tail.len() + joiner.len() + current.len());
    combined.push_str(tail);
    combined.push_str(joiner);
    combined.push_str(current);
    combined
}

/// Longest suffix of `text` within `limit` characters that starts on a word.
///
/// Falls back to the last `limit` characters, minus leading whitespace, when the final word alone
/// is longer than `limit`.
fn overlap_tail(text: &str, limit: usize) -> &str {
    if limit == 0 {
        return "";
    }

    let first = count_chars(text).saturating_sub(limit);
    let mut fragment = None;
    let mut previous = None;
    for (position, (offset, ch)) in text.char_indices().enumerate() {
        if position >= first && !ch.is_whitespace() {
            if previous.is_none_or(char::is_whitespace) {
                return &text[offset..];
            }
            fragment.get_or_insert(offset);
        }
        previous = Some(ch);
    }

    fragment.map_or("", |offset| &text[offset..])
}
