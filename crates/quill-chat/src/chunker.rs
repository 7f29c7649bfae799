//! Fixed-width overlapping text chunker.
//!
//! Splits extracted document text into character windows of `chunk_size`
//! where each window after the first starts `overlap` characters before the
//! previous window's end, bounding the context handed to the generation
//! provider. Pure: no I/O, deterministic for identical inputs.

use crate::error::ChatError;

/// Split text into overlapping windows of `chunk_size` characters.
///
/// Texts of at most `chunk_size` characters come back as a single chunk.
/// The final window is truncated at the end of the text; the walk stops the
/// instant a window reaches it. `overlap >= chunk_size` would make the
/// stride non-positive and loop forever, so it is rejected up front.
///
/// Windows are measured in characters, with slicing kept on UTF-8
/// boundaries.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChatError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(ChatError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }

    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;

    if total_chars <= chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(total_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == total_chars {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}
