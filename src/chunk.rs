//! Fixed-size overlapping text chunker.
//!
//! Splits extracted document text into windows of `chunk_size` characters,
//! each overlapping the previous one by `overlap` characters, sized for
//! embedding. Boundaries are character offsets, not token- or word-aware;
//! a window may end mid-word.

/// Split text into overlapping windows.
///
/// Returns `[text]` when the text fits in a single window. Otherwise the
/// window start advances by `chunk_size - overlap` per step and the final
/// window is whatever remains (possibly shorter than `chunk_size`); the
/// scan stops as soon as a window reaches the end of the text, so no
/// trailing duplicate window is emitted.
///
/// Offsets are counted in characters so multi-byte input never splits a
/// UTF-8 sequence. An `overlap >= chunk_size` is clamped to
/// `chunk_size - 1` (config validation rejects it earlier).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, 200);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn text_exactly_chunk_size_is_a_single_chunk() {
        let text = "x".repeat(1000);
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn empty_text_is_a_single_empty_chunk() {
        let chunks = chunk_text("", 1000, 200);
        assert_eq!(chunks, vec![String::new()]);
    }

    #[test]
    fn windows_start_at_expected_offsets() {
        // 2500 chars, 1000/200 -> windows at 0, 800, 1600; the last covers
        // [1600..2500] and is 900 chars long.
        let text = "a".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1000);
        assert_eq!(chunks[1].len(), 1000);
        assert_eq!(chunks[2].len(), 900);
    }

    #[test]
    fn consecutive_chunks_overlap_exactly() {
        let text: String = (0..2500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, 1000, 200);
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0].chars().skip(800).collect();
            let next_head: String = pair[1].chars().take(200).collect();
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn residues_reconstruct_the_input() {
        let text: String = (0..3141).map(|i| char::from(b'A' + (i % 23) as u8)).collect();
        let chunks = chunk_text(&text, 1000, 200);

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            // Everything past the overlapping prefix is new text.
            rebuilt.extend(chunk.chars().skip(200));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn multibyte_text_never_splits_a_scalar() {
        let text = "é".repeat(25);
        let chunks = chunk_text(&text, 10, 2);
        for chunk in &chunks {
            assert!(chunk.chars().all(|c| c == 'é'));
        }
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn oversized_overlap_is_clamped_and_terminates() {
        let text = "b".repeat(50);
        let chunks = chunk_text(&text, 10, 10);
        // Clamped to overlap 9 -> step 1; must terminate and cover the text.
        assert!(!chunks.is_empty());
        assert_eq!(chunks.last().unwrap().chars().last(), Some('b'));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "d".repeat(4321);
        assert_eq!(chunk_text(&text, 1000, 200), chunk_text(&text, 1000, 200));
    }
}
