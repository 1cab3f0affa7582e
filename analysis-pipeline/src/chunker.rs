//! Sliding-window token-bounded text splitting.

use common::error::AppError;

use crate::oracle::TokenCodec;

pub const DEFAULT_MAX_WINDOW_TOKENS: usize = 400;
pub const DEFAULT_OVERLAP_TOKENS: usize = 100;

/// Splits `text` into windows of at most `max_window_tokens` tokens,
/// adjacent windows sharing `overlap_tokens` tokens. Text that already
/// fits is returned unchanged as a single chunk, bypassing the decode
/// path entirely. The final window is clipped to the sequence end and
/// the loop stops there, so there is never a trailing duplicate.
pub fn chunk_text(
    text: &str,
    codec: &dyn TokenCodec,
    max_window_tokens: usize,
    overlap_tokens: usize,
) -> Result<Vec<String>, AppError> {
    if max_window_tokens == 0 || overlap_tokens >= max_window_tokens {
        return Err(AppError::Validation(format!(
            "overlap ({overlap_tokens}) must be smaller than the window ({max_window_tokens})"
        )));
    }

    let ids = codec.encode(text)?;
    if ids.len() <= max_window_tokens {
        return Ok(vec![text.to_string()]);
    }

    let step = max_window_tokens - overlap_tokens;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_window_tokens).min(ids.len());
        chunks.push(codec.decode(&ids[start..end])?);
        if end == ids.len() {
            break;
        }
        start += step;
    }
    Ok(chunks)
}
