//! Assembles ranked retrieval passages into a single bounded context block.
//!
//! The assembler consumes passages in rank order and stops at the first
//! passage that would push the cumulative content size past the character
//! budget. Passages are never truncated mid-text: either a whole passage
//! fits or it is omitted and assembly stops, since everything after it has
//! lower rank anyway.
//!
//! An empty result set produces the empty string. Callers treat that as the
//! "no relevant knowledge found" signal and must branch on it rather than
//! fabricate an answer.

use serde::Serialize;

/// Delimiter inserted between passages in the assembled block.
pub const PASSAGE_DELIMITER: &str = "\n\n---\n\n";

/// A ranked passage destined for the context block.
#[derive(Debug, Clone, Serialize)]
pub struct ContextPassage {
    /// Logical source document the passage came from.
    pub source: String,
    /// Combined relevance score, included in the provenance tag.
    pub score: f32,
    /// Passage text.
    pub content: String,
}

impl ContextPassage {
    /// Render the passage with its provenance tag.
    fn render(&self) -> String {
        format!(
            "[From {} (relevance: {:.2})]:\n{}",
            self.source, self.score, self.content
        )
    }
}

/// Builds context blocks under a fixed character budget.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Concatenate passages in the given order until the budget is reached.
    ///
    /// The budget counts passage content characters; the provenance tags and
    /// delimiters are deliberate overhead outside the budget. Returns the
    /// empty string when `passages` is empty.
    pub fn build_context(&self, passages: &[ContextPassage]) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut total_chars = 0usize;

        for passage in passages {
            if passage.content.is_empty() {
                continue;
            }
            let content_chars = passage.content.chars().count();
            if total_chars + content_chars > self.max_chars {
                break;
            }
            parts.push(passage.render());
            total_chars += content_chars;
        }

        parts.join(PASSAGE_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(source: &str, score: f32, content: &str) -> ContextPassage {
        ContextPassage {
            source: source.to_string(),
            score,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_empty_results_produce_empty_string() {
        let assembler = ContextAssembler::new(1000);
        assert_eq!(assembler.build_context(&[]), "");
    }

    #[test]
    fn test_provenance_tags_and_delimiter() {
        let assembler = ContextAssembler::new(1000);
        let block = assembler.build_context(&[
            passage("hours.md", 0.91, "Open weekdays 9-5."),
            passage("fees.md", 0.52, "Transfers are free."),
        ]);

        assert!(block.starts_with("[From hours.md (relevance: 0.91)]:\nOpen weekdays 9-5."));
        assert!(block.contains(PASSAGE_DELIMITER));
        assert!(block.ends_with("[From fees.md (relevance: 0.52)]:\nTransfers are free."));
    }

    #[test]
    fn test_budget_stops_at_first_oversized_passage() {
        let assembler = ContextAssembler::new(25);
        let block = assembler.build_context(&[
            passage("a.txt", 0.9, "twenty characters ok"), // 20 chars
            passage("b.txt", 0.8, "this one will not fit at all"),
            passage("c.txt", 0.7, "tiny"),
        ]);

        // The second passage busts the budget; assembly stops there rather
        // than skipping ahead to the lower-ranked third passage.
        assert!(block.contains("a.txt"));
        assert!(!block.contains("b.txt"));
        assert!(!block.contains("c.txt"));
    }

    #[test]
    fn test_passages_never_truncated() {
        let assembler = ContextAssembler::new(10);
        let block = assembler.build_context(&[passage("a.txt", 0.9, "far too long to fit")]);
        assert_eq!(block, "");
    }

    #[test]
    fn test_passage_serializes() {
        let value = serde_json::to_value(passage("faq.md", 0.75, "Dial *462#.")).unwrap();
        assert_eq!(value["source"], "faq.md");
        assert_eq!(value["content"], "Dial *462#.");
    }
}
