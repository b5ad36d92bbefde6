//! Sentence-aware text segmentation for large documents
//!
//! Sizes are measured in estimated tokens: `ceil(chars / 4)`. That is a cheap
//! heuristic, not a tokenizer.

use std::collections::HashSet;

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Upper bound on sentences carried over as overlap into the next chunk
const MAX_OVERLAP_SENTENCES: usize = 8;

/// Estimated token count of `text`
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_chars(text.chars().count())
}

fn tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Split `content` into overlapping chunks of at most `max_tokens` each.
///
/// Shorthand for `TextSegmenter::new(max_tokens, overlap_tokens).segment(content)`.
pub fn segment(content: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<String> {
    TextSegmenter::new(max_tokens, overlap_tokens).segment(content)
}

/// Splits text into bounded, overlapping, sentence-respecting chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegmenter {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl TextSegmenter {
    /// Create a new segmenter
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_tokens,
        }
    }

    /// Token budget per chunk
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Token budget for the context carried into the next chunk
    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Segment the given text.
    ///
    /// - Blank input gives no chunks.
    /// - Input within budget comes back unchanged as the only chunk.
    /// - Otherwise sentences are packed into chunks within budget. Each new
    ///   chunk starts with trailing sentences of the previous one, up to
    ///   `overlap_tokens`. A sentence that alone exceeds the budget becomes
    ///   its own chunk; sentences are never split.
    /// - Identical chunks are dropped, keeping the first.
    pub fn segment(&self, content: &str) -> Vec<String> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        if estimate_tokens(content) <= self.max_tokens {
            return vec![content.to_string()];
        }

        let mut chunks = Vec::new();
        let mut buffer = ChunkBuffer::default();

        for sentence in split_sentences(content) {
            let sentence_chars = sentence.chars().count();

            if !buffer.is_empty()
                && tokens_for_chars(buffer.chars_with(sentence_chars)) > self.max_tokens
            {
                chunks.push(buffer.text());
                buffer = self.overlap_from(&buffer);

                // Carried-over context must not push the next sentence over budget.
                while !buffer.is_empty()
                    && tokens_for_chars(buffer.chars_with(sentence_chars)) > self.max_tokens
                {
                    buffer.pop_front();
                }
            }

            buffer.push(sentence, sentence_chars);
        }

        if !buffer.is_empty() {
            chunks.push(buffer.text());
        }

        dedup_preserving_order(chunks)
    }

    /// Trailing sentences of `flushed` that fit in the overlap budget
    fn overlap_from<'a>(&self, flushed: &ChunkBuffer<'a>) -> ChunkBuffer<'a> {
        let mut picked: Vec<(&'a str, usize)> = Vec::new();
        let mut chars = 0;

        for &(sentence, sentence_chars) in flushed.sentences.iter().rev().take(MAX_OVERLAP_SENTENCES) {
            let candidate = if picked.is_empty() {
                sentence_chars
            } else {
                chars + 1 + sentence_chars
            };
            if tokens_for_chars(candidate) > self.overlap_tokens {
                break;
            }
            chars = candidate;
            picked.push((sentence, sentence_chars));
        }

        let mut seed = ChunkBuffer::default();
        for (sentence, sentence_chars) in picked.into_iter().rev() {
            seed.push(sentence, sentence_chars);
        }
        seed
    }
}

/// Sentences of the chunk being built, joined with single spaces on flush.
/// Tracks the joined character count so budget checks stay O(1).
#[derive(Debug, Default)]
struct ChunkBuffer<'a> {
    sentences: Vec<(&'a str, usize)>,
    chars: usize,
}

impl<'a> ChunkBuffer<'a> {
    fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Joined length if a sentence of `sentence_chars` were appended
    fn chars_with(&self, sentence_chars: usize) -> usize {
        if self.is_empty() {
            sentence_chars
        } else {
            self.chars + 1 + sentence_chars
        }
    }

    fn push(&mut self, sentence: &'a str, sentence_chars: usize) {
        self.chars = self.chars_with(sentence_chars);
        self.sentences.push((sentence, sentence_chars));
    }

    fn pop_front(&mut self) {
        if self.sentences.is_empty() {
            return;
        }
        let (_, removed) = self.sentences.remove(0);
        self.chars = if self.sentences.is_empty() {
            0
        } else {
            self.chars - removed - 1
        };
    }

    fn text(&self) -> String {
        let mut out = String::with_capacity(self.chars);
        for (i, (sentence, _)) in self.sentences.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(sentence);
        }
        out
    }
}

/// Best-effort sentence split.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace, and only when
/// the next non-whitespace character is uppercase or there is nothing left.
/// So "e.g. this" and "v1.2 is out" stay whole. Returned sentences are
/// trimmed and never empty.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        let end = idx + ch.len_utf8();
        let rest = &text[end..];
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }

        let boundary = match rest.trim_start().chars().next() {
            None => true,
            Some(next) => next.is_uppercase(),
        };
        if boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn dedup_preserving_order(chunks: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(chunks.len());
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Four 15-char sentences; any two joined are 31 chars (8 tokens).
    const FOUR: &str = "Aaaa aaaa aaaa. Bbbb bbbb bbbb. Cccc cccc cccc. Dddd dddd dddd.";

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        // Counted in characters, not bytes.
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(segment("", 10, 2).is_empty());
        assert!(segment("   \n\t ", 10, 2).is_empty());
    }

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let text = "Alice works at Google using Python.";
        assert_eq!(segment(text, 3000, 200), vec![text.to_string()]);

        // Returned verbatim, surrounding whitespace included.
        let padded = "  Short text here.\n";
        assert_eq!(segment(padded, 100, 0), vec![padded.to_string()]);
    }

    #[test]
    fn test_packs_sentences_without_overlap() {
        let chunks = segment(FOUR, 8, 0);
        assert_eq!(
            chunks,
            vec![
                "Aaaa aaaa aaaa. Bbbb bbbb bbbb.",
                "Cccc cccc cccc. Dddd dddd dddd.",
            ]
        );
    }

    #[test]
    fn test_overlap_carries_trailing_sentence() {
        let chunks = segment(FOUR, 8, 4);
        assert_eq!(
            chunks,
            vec![
                "Aaaa aaaa aaaa. Bbbb bbbb bbbb.",
                "Bbbb bbbb bbbb. Cccc cccc cccc.",
                "Cccc cccc cccc. Dddd dddd dddd.",
            ]
        );
    }

    #[test]
    fn test_overlap_never_exceeds_its_budget() {
        // One sentence is 4 tokens; an overlap budget of 3 carries nothing.
        let chunks = segment(FOUR, 8, 3);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].starts_with("Cccc"));
    }

    #[test]
    fn test_oversized_sentence_is_its_own_chunk() {
        let long = format!("Word{}.", " word".repeat(39));
        let text = format!("Short one. {} Another short one.", long);
        let chunks = segment(&text, 10, 0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "Short one.");
        assert_eq!(chunks[1], long);
        assert!(estimate_tokens(&chunks[1]) > 10);
        assert_eq!(chunks[2], "Another short one.");
    }

    #[test]
    fn test_overlap_dropped_when_it_would_overflow() {
        // Every sentence is over budget on its own; carrying one over would
        // make every following chunk two sentences long.
        let chunks = segment(FOUR, 3, 4);
        assert_eq!(
            chunks,
            vec![
                "Aaaa aaaa aaaa.",
                "Bbbb bbbb bbbb.",
                "Cccc cccc cccc.",
                "Dddd dddd dddd.",
            ]
        );
    }

    #[test]
    fn test_repeated_chunks_are_deduplicated() {
        let text = "Same thing here. Same thing here. Same thing here. Same thing here.";
        assert_eq!(segment(text, 4, 0), vec!["Same thing here."]);
    }

    #[test]
    fn test_split_requires_uppercase_after_terminator() {
        let sentences = split_sentences("Use tools e.g. hammers. Then rest! Why? because. Done.");
        assert_eq!(
            sentences,
            vec!["Use tools e.g. hammers.", "Then rest!", "Why? because.", "Done."]
        );
    }

    #[test]
    fn test_split_needs_whitespace_after_terminator() {
        let sentences = split_sentences("Version 1.2 shipped.Next line. Final");
        assert_eq!(sentences, vec!["Version 1.2 shipped.Next line.", "Final"]);
    }

    #[test]
    fn test_split_handles_trailing_whitespace_and_ellipsis() {
        assert_eq!(split_sentences("Wait... What now.  \n"), vec!["Wait...", "What now."]);
        assert_eq!(split_sentences("no terminator at all"), vec!["no terminator at all"]);
    }

    #[test]
    fn test_text_without_boundaries_stays_whole() {
        let text = "lowercase. only. sentences. ".repeat(20);
        let chunks = segment(&text, 10, 2);
        assert_eq!(chunks, vec![text.trim().to_string()]);
    }
}
