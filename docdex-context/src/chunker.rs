//! Overlapping text segmentation for embedding and retrieval.
//!
//! Documents are split into chunks bounded by a target character size,
//! preferring paragraph boundaries over mid-word splits. Consecutive chunks
//! share a configurable character overlap so that sentences cut at a chunk
//! boundary still appear whole in at least one chunk.
//!
//! The splitter works in three stages:
//!
//! 1. Paragraphs (delimited by [`TextChunker::separator`]) are greedily
//!    packed into chunks while they fit within `chunk_size`.
//! 2. A paragraph that alone exceeds `chunk_size` falls back to word-level
//!    greedy packing within that paragraph.
//! 3. Each chunk after the first is prefixed with the final `chunk_overlap`
//!    characters of its predecessor. The first chunk is never overlapped.
//!
//! Splitting is deterministic for identical input and configuration. All
//! sizes are measured in characters, not bytes, so multi-byte input never
//! splits inside a code point.

/// Default target chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Default paragraph separator.
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Splits document text into overlapping chunks for embedding.
///
/// See the module docs for the splitting algorithm. Construct with
/// [`TextChunker::new`] or [`TextChunker::default`]; an overlap that is not
/// strictly smaller than the chunk size is clamped to `chunk_size - 1`.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separator: String,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(
            DEFAULT_CHUNK_SIZE,
            DEFAULT_CHUNK_OVERLAP,
            DEFAULT_SEPARATOR.to_string(),
        )
    }
}

impl TextChunker {
    /// Create a chunker with the given size, overlap, and paragraph separator.
    pub fn new(chunk_size: usize, chunk_overlap: usize, separator: String) -> Self {
        let chunk_size = chunk_size.max(1);
        // An overlap >= chunk_size would make every chunk a superset of its
        // predecessor; clamp rather than reject.
        let chunk_overlap = chunk_overlap.min(chunk_size - 1);
        Self {
            chunk_size,
            chunk_overlap,
            separator,
        }
    }

    /// Target chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into overlapping chunks.
    ///
    /// Returns an empty vector for input that is empty after trimming.
    /// Input no longer than the chunk size comes back as a single chunk
    /// containing the whole trimmed text, with no overlap applied.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let chunks = self.split_unoverlapped(text);
        self.apply_overlap(chunks)
    }

    /// Greedy paragraph packing with word-level fallback, no overlap yet.
    fn split_unoverlapped(&self, text: &str) -> Vec<String> {
        let separator_len = char_len(&self.separator);
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for paragraph in text.split(self.separator.as_str()) {
            let paragraph_len = char_len(paragraph);

            if current_len + paragraph_len + separator_len <= self.chunk_size {
                if current.is_empty() {
                    current.push_str(paragraph);
                    current_len = paragraph_len;
                } else {
                    current.push_str(&self.separator);
                    current.push_str(paragraph);
                    current_len += separator_len + paragraph_len;
                }
                continue;
            }

            if !current.is_empty() {
                push_trimmed(&mut chunks, &current);
            }

            if paragraph_len > self.chunk_size {
                // The paragraph alone is oversized: pack its words greedily.
                current.clear();
                current_len = 0;
                for word in paragraph.split_whitespace() {
                    let word_len = char_len(word);
                    if current_len + word_len + 1 <= self.chunk_size {
                        if current.is_empty() {
                            current.push_str(word);
                            current_len = word_len;
                        } else {
                            current.push(' ');
                            current.push_str(word);
                            current_len += word_len + 1;
                        }
                    } else {
                        if !current.is_empty() {
                            push_trimmed(&mut chunks, &current);
                        }
                        current.clear();
                        current.push_str(word);
                        current_len = word_len;
                    }
                }
            } else {
                current.clear();
                current.push_str(paragraph);
                current_len = paragraph_len;
            }
        }

        if !current.trim().is_empty() {
            push_trimmed(&mut chunks, &current);
        }

        chunks
    }

    /// Prefix each chunk after the first with its predecessor's tail.
    fn apply_overlap(&self, chunks: Vec<String>) -> Vec<String> {
        if self.chunk_overlap == 0 || chunks.len() < 2 {
            return chunks;
        }

        let mut overlapped = Vec::with_capacity(chunks.len());
        overlapped.push(chunks[0].clone());
        for i in 1..chunks.len() {
            let tail = tail_chars(&chunks[i - 1], self.chunk_overlap);
            overlapped.push(format!("{tail}{}", chunks[i]));
        }
        overlapped
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// The final `n` characters of `s`, or all of `s` if it is shorter.
fn tail_chars(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if len <= n {
        return s;
    }
    let (idx, _) = s
        .char_indices()
        .nth(len - n)
        .expect("offset within char count");
    &s[idx..]
}
